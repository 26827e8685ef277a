use tokio::task;

use crate::utils::error::AppError;

/// Hashes on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::InternalFailure(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::InternalFailure(format!("password hashing failed: {e}")))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::InternalFailure(format!("password check task failed: {e}")))?
        .map_err(|e| AppError::InternalFailure(format!("password check failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn hash_verifies_only_the_original_password() {
        let hash = hash_password("correct horse".into(), TEST_COST).await.unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse".into(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("battery staple".into(), hash).await.unwrap());
    }
}
