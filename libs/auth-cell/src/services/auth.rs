use std::sync::OnceLock;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, info, warn};

use shared_config::SeedDoctor;
use shared_database::{doctors, DatabaseError};
use shared_models::doctor::{Doctor, NewDoctor};
use shared_utils::extractor::non_blank;
use shared_utils::password::{hash_password, verify_password};
use shared_utils::AppState;

use crate::models::{AuthError, LoginRequest, RegisterRequest};

/// Hash checked when the email is unknown, so both failure paths cost one verification.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        let filler: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        hash_password(&filler).unwrap_or_default()
    })
}

async fn hash_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// An unreadable stored hash counts as a mismatch.
async fn verify_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    let outcome = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!("Stored password hash could not be verified: {}", e);
            Ok(false)
        }
    }
}

pub struct AuthService {
    state: AppState,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Doctor, AuthError> {
        let email = non_blank(request.email).ok_or(AuthError::MissingCredentials)?;
        let password = request.password.filter(|p| !p.is_empty()).ok_or(AuthError::MissingCredentials)?;
        debug!("Login attempt for {}", email);

        let lookup = email.clone();
        let doctor = self
            .state
            .db
            .run(move |conn| doctors::find_by_email(conn, &lookup))
            .await?;

        let Some(doctor) = doctor else {
            verify_blocking(password, dummy_hash().to_string()).await.ok();
            warn!("Login failed: unknown email {}", email);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_blocking(password, doctor.password_hash.clone()).await? {
            warn!("Login failed: wrong password for doctor {}", doctor.id);
            return Err(AuthError::InvalidCredentials);
        }

        info!("Doctor {} logged in", doctor.id);
        Ok(doctor)
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Doctor, AuthError> {
        let email = non_blank(request.email).ok_or(AuthError::MissingCredentials)?;
        let password = request.password.filter(|p| !p.is_empty()).ok_or(AuthError::MissingCredentials)?;
        debug!("Registering doctor {}", email);

        let new_doctor = NewDoctor {
            email,
            password_hash: hash_blocking(password).await?,
            first_name: non_blank(request.first_name),
            last_name: non_blank(request.last_name),
        };

        let doctor = self
            .state
            .db
            .run(move |conn| {
                if doctors::find_by_email(conn, &new_doctor.email)?.is_some() {
                    return Ok(None);
                }
                doctors::insert_doctor(conn, &new_doctor, Utc::now()).map(Some)
            })
            .await
            .map_err(|e| match e {
                DatabaseError::ConstraintViolation(_) => AuthError::EmailAlreadyExists,
                other => AuthError::Database(other),
            })?
            .ok_or(AuthError::EmailAlreadyExists)?;

        info!("Registered doctor {}", doctor.id);
        Ok(doctor)
    }

    /// Create the configured default doctor if nobody has an account yet.
    pub async fn seed_default_doctor(&self, seed: &SeedDoctor) -> Result<Option<Doctor>, AuthError> {
        let existing = self.state.db.run(|conn| doctors::count_doctors(conn)).await?;
        if existing > 0 {
            debug!("{} doctor(s) present, skipping seed", existing);
            return Ok(None);
        }

        let new_doctor = NewDoctor {
            email: seed.email.clone(),
            password_hash: hash_blocking(seed.password.clone()).await?,
            first_name: non_blank(Some(seed.first_name.clone())),
            last_name: non_blank(Some(seed.last_name.clone())),
        };
        let doctor = self
            .state
            .db
            .run(move |conn| doctors::insert_doctor(conn, &new_doctor, Utc::now()))
            .await?;

        info!("Created default doctor {}", doctor.email);
        Ok(Some(doctor))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use shared_utils::test_utils::TestConfig;

    fn seed() -> SeedDoctor {
        SeedDoctor {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            first_name: "Test".to_string(),
            last_name: "Doctor".to_string(),
        }
    }

    #[tokio::test]
    async fn seed_runs_only_on_empty_store() {
        let state = TestConfig::default().to_state();
        let service = AuthService::new(&state);

        let created = service.seed_default_doctor(&seed()).await.unwrap();
        assert_matches!(created, Some(ref d) if d.email == "test@example.com");
        assert!(service.seed_default_doctor(&seed()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seeded_doctor_can_log_in() {
        let state = TestConfig::default().to_state();
        let service = AuthService::new(&state);
        service.seed_default_doctor(&seed()).await.unwrap();

        let doctor = service
            .login(LoginRequest {
                email: Some("test@example.com".to_string()),
                password: Some("password123".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(doctor.full_name(), "Test Doctor");
    }

    #[tokio::test]
    async fn malformed_stored_hash_is_invalid_credentials() {
        let state = TestConfig::default().to_state();
        let new_doctor = NewDoctor {
            email: "legacy@example.com".to_string(),
            password_hash: "password123".to_string(),
            first_name: None,
            last_name: None,
        };
        state
            .db
            .run(move |conn| doctors::insert_doctor(conn, &new_doctor, Utc::now()))
            .await
            .unwrap();

        let result = AuthService::new(&state)
            .login(LoginRequest {
                email: Some("legacy@example.com".to_string()),
                password: Some("password123".to_string()),
            })
            .await;
        assert_matches!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected_before_lookup() {
        let state = TestConfig::default().to_state();
        let service = AuthService::new(&state);

        let result = service
            .login(LoginRequest {
                email: Some("   ".to_string()),
                password: Some("x".to_string()),
            })
            .await;
        assert_matches!(result, Err(AuthError::MissingCredentials));
    }
}
