use crate::config::EnvironmentConfig;
use crate::dto::auth_dto::{
    AuthResponse, CreateStaffRequest, LoginRequest, ProfileResponse, RegisterRequest, UserResponse,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::user::{User, UserRole};
use crate::repositories::user_repository::UserRepository;
use crate::services::booking_service::outstanding_fine;
use crate::services::mailer::{staff_credentials_email, welcome_email, Mailer};
use crate::utils::errors::AppError;
use crate::utils::jwt::{generate_token, JwtConfig};
use crate::utils::validation;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct AuthController {
    repository: UserRepository,
    config: EnvironmentConfig,
    mailer: Arc<dyn Mailer>,
}

impl AuthController {
    pub fn new(pool: PgPool, config: EnvironmentConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            repository: UserRepository::new(pool),
            config,
            mailer,
        }
    }

    pub async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<ApiResponse<AuthResponse>, AppError> {
        request.validate()?;
        validation::validate_phone(&request.phone)
            .map_err(|e| validation::into_app_error("phone", e))?;

        if self.repository.email_exists(&request.email).await? {
            return Err(AppError::Conflict("El email ya está registrado".to_string()));
        }

        let password_hash = hash(&request.password, DEFAULT_COST)
            .map_err(|e| AppError::Hash(format!("Error hashing password: {}", e)))?;

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            phone: request.phone,
            password_hash,
            role: UserRole::Customer,
            office_location_id: None,
            no_show_count: 0,
            cancellation_count: 0,
            created_at: now,
            updated_at: now,
        };

        let saved = self.repository.create(&user).await?;
        log::info!("✅ Cliente registrado: {}", saved.email);

        let mailer = self.mailer.clone();
        let (subject, body) = welcome_email(&saved.name);
        let to = saved.email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, body).await {
                log::error!("📧 Error enviando correo de bienvenida: {}", e);
            }
        });

        let jwt_config = JwtConfig::from(&self.config);
        let token = generate_token(saved.user_id, saved.role.as_str(), &jwt_config)?;

        Ok(ApiResponse::success_with_message(
            AuthResponse {
                token,
                user: UserResponse::from(saved),
            },
            "Cuenta creada exitosamente".to_string(),
        ))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<ApiResponse<AuthResponse>, AppError> {
        request.validate()?;

        let user = self
            .repository
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Credenciales inválidas".to_string()))?;

        let valid = verify(&request.password, &user.password_hash)
            .map_err(|e| AppError::Hash(format!("Error verifying password: {}", e)))?;
        if !valid {
            return Err(AppError::Unauthorized("Credenciales inválidas".to_string()));
        }

        let jwt_config = JwtConfig::from(&self.config);
        let token = generate_token(user.user_id, user.role.as_str(), &jwt_config)?;

        log::info!("✅ Login correcto: {}", user.email);
        Ok(ApiResponse::success(AuthResponse {
            token,
            user: UserResponse::from(user),
        }))
    }

    /// Perfil del usuario autenticado con su multa pendiente
    pub async fn profile(
        &self,
        principal: &AuthenticatedUser,
    ) -> Result<ApiResponse<ProfileResponse>, AppError> {
        let user = self
            .repository
            .find_by_id(principal.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

        let fine = outstanding_fine(
            user.no_show_count,
            user.cancellation_count,
            self.config.fine_no_show,
            self.config.fine_cancel,
        );

        Ok(ApiResponse::success(ProfileResponse {
            user: UserResponse::from(user),
            outstanding_fine: fine,
        }))
    }

    /// Alta de personal por un admin. La contraseña temporal viaja solo
    /// por correo, nunca en la respuesta HTTP.
    pub async fn create_staff(
        &self,
        request: CreateStaffRequest,
    ) -> Result<ApiResponse<UserResponse>, AppError> {
        request.validate()?;
        validation::validate_phone(&request.phone)
            .map_err(|e| validation::into_app_error("phone", e))?;

        if request.role == UserRole::Customer {
            return Err(AppError::ValidationError(
                "El rol debe ser staff o admin".to_string(),
            ));
        }
        if request.role == UserRole::Staff && request.office_location_id.is_none() {
            return Err(AppError::ValidationError(
                "El personal necesita una oficina asignada".to_string(),
            ));
        }

        if self.repository.email_exists(&request.email).await? {
            return Err(AppError::Conflict("El email ya está registrado".to_string()));
        }

        let temp_password = generate_temp_password();
        let password_hash = hash(&temp_password, DEFAULT_COST)
            .map_err(|e| AppError::Hash(format!("Error hashing password: {}", e)))?;

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            phone: request.phone,
            password_hash,
            role: request.role,
            office_location_id: request.office_location_id,
            no_show_count: 0,
            cancellation_count: 0,
            created_at: now,
            updated_at: now,
        };

        let saved = self.repository.create(&user).await?;
        log::info!("✅ Cuenta de personal creada: {} ({})", saved.email, saved.role.as_str());

        let mailer = self.mailer.clone();
        let (subject, body) = staff_credentials_email(&saved.name, &saved.email, &temp_password);
        let to = saved.email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, body).await {
                log::error!("📧 Error enviando credenciales de personal: {}", e);
            }
        });

        Ok(ApiResponse::success_with_message(
            UserResponse::from(saved),
            "Cuenta de personal creada, credenciales enviadas por correo".to_string(),
        ))
    }

    pub async fn list_staff(&self) -> Result<ApiResponse<Vec<UserResponse>>, AppError> {
        let staff = self.repository.list_staff().await?;
        Ok(ApiResponse::success(
            staff.into_iter().map(UserResponse::from).collect(),
        ))
    }
}

fn generate_temp_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_password_length() {
        let password = generate_temp_password();
        assert_eq!(password.len(), 12);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
