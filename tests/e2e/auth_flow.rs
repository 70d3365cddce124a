//! Authentication Flow E2E Tests
//!
//! Token validation and ownership checks, and that a rejected request leaves
//! no trace in storage or on the record.

#[cfg(test)]
mod tests {
    use crate::e2e::common::*;
    use tubely_ingest::db::RecordStore;
    use uuid::Uuid;

    async fn assert_untouched(env: &E2ETestEnv, video_id: Uuid) {
        let record = env.records.get_video(video_id).await.unwrap();
        assert!(record.thumbnail_url.is_none());
        assert!(record.video_url.is_none());
        assert!(env.objects.puts().is_empty());
        assert!(env.probe.seen().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token() {
        let env = E2ETestEnv::new().await;
        let video = env.seed_video(Uuid::new_v4());

        let response = env
            .upload_video(video.id, "video/mp4", mp4_bytes(), None)
            .await;
        assert_eq!(response.status(), 401);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].is_string());

        assert_untouched(&env, video.id).await;
    }

    #[tokio::test]
    async fn test_expired_token() {
        let env = E2ETestEnv::new().await;
        let owner = Uuid::new_v4();
        let video = env.seed_video(owner);
        let token = E2ETestEnv::generate_expired_jwt(owner);

        let response = env
            .upload_thumbnail(video.id, "image/png", b"png".to_vec(), Some(&token))
            .await;
        assert_eq!(response.status(), 401);
        assert_untouched(&env, video.id).await;
    }

    #[tokio::test]
    async fn test_wrong_secret() {
        let env = E2ETestEnv::new().await;
        let owner = Uuid::new_v4();
        let video = env.seed_video(owner);
        let token = E2ETestEnv::generate_foreign_jwt(owner);

        let response = env
            .upload_thumbnail(video.id, "image/png", b"png".to_vec(), Some(&token))
            .await;
        assert_eq!(response.status(), 401);
        assert_untouched(&env, video.id).await;
    }

    #[tokio::test]
    async fn test_not_owner_thumbnail() {
        let env = E2ETestEnv::new().await;
        let video = env.seed_video(Uuid::new_v4());
        let intruder = E2ETestEnv::generate_test_jwt(Uuid::new_v4(), 3600);

        let response = env
            .upload_thumbnail(video.id, "image/jpeg", jpeg_bytes(), Some(&intruder))
            .await;
        assert_eq!(response.status(), 401);

        assert_untouched(&env, video.id).await;
        assert_eq!(std::fs::read_dir(&env.assets_root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_not_owner_video() {
        let env = E2ETestEnv::new().await;
        let video = env.seed_video(Uuid::new_v4());
        let intruder = E2ETestEnv::generate_test_jwt(Uuid::new_v4(), 3600);

        let response = env
            .upload_video(video.id, "video/mp4", mp4_bytes(), Some(&intruder))
            .await;
        assert_eq!(response.status(), 401);

        assert_untouched(&env, video.id).await;
        assert!(env.temp_files().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_video() {
        let env = E2ETestEnv::new().await;
        let user = Uuid::new_v4();
        let token = E2ETestEnv::generate_test_jwt(user, 3600);

        let response = env
            .upload_video(Uuid::new_v4(), "video/mp4", mp4_bytes(), Some(&token))
            .await;
        assert_eq!(response.status(), 500);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Couldn't find video");
        assert!(env.objects.puts().is_empty());
    }
}
