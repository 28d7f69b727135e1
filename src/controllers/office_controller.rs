use crate::dto::office_dto::{CreateOfficeRequest, OfficeResponse, UpdateOfficeRequest};
use crate::dto::ApiResponse;
use crate::repositories::OfficeRepository;
use crate::utils::errors::AppError;
use crate::utils::validation;
use sqlx::PgPool;
use validator::Validate;

pub struct OfficeController {
    repository: OfficeRepository,
}

impl OfficeController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: OfficeRepository::new(pool),
        }
    }

    pub async fn list_offices(&self) -> Result<ApiResponse<Vec<OfficeResponse>>, AppError> {
        let offices = self.repository.list_all().await?;
        Ok(ApiResponse::success(
            offices.into_iter().map(OfficeResponse::from).collect(),
        ))
    }

    pub async fn get_office(&self, office_id: i32) -> Result<ApiResponse<OfficeResponse>, AppError> {
        let office = self
            .repository
            .find_by_id(office_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Oficina no encontrada".to_string()))?;

        Ok(ApiResponse::success(OfficeResponse::from(office)))
    }

    pub async fn create_office(
        &self,
        request: CreateOfficeRequest,
    ) -> Result<ApiResponse<OfficeResponse>, AppError> {
        request.validate()?;
        validation::validate_coordinates(request.latitude, request.longitude)
            .map_err(|e| validation::into_app_error("coordinates", e))?;
        if let Some(radius) = request.service_radius_km {
            validation::validate_positive(radius)
                .map_err(|e| validation::into_app_error("service_radius_km", e))?;
        }

        let office = self.repository.create(&request).await?;
        log::info!("✅ Oficina creada: {}", office.location_name);

        Ok(ApiResponse::success_with_message(
            OfficeResponse::from(office),
            "Oficina creada exitosamente".to_string(),
        ))
    }

    pub async fn update_office(
        &self,
        office_id: i32,
        request: UpdateOfficeRequest,
    ) -> Result<ApiResponse<OfficeResponse>, AppError> {
        if let (Some(lat), Some(lng)) = (request.latitude, request.longitude) {
            validation::validate_coordinates(lat, lng)
                .map_err(|e| validation::into_app_error("coordinates", e))?;
        }
        if let Some(radius) = request.service_radius_km {
            validation::validate_positive(radius)
                .map_err(|e| validation::into_app_error("service_radius_km", e))?;
        }

        let office = self.repository.update(office_id, &request).await?;
        Ok(ApiResponse::success_with_message(
            OfficeResponse::from(office),
            "Oficina actualizada exitosamente".to_string(),
        ))
    }

    pub async fn delete_office(&self, office_id: i32) -> Result<ApiResponse<()>, AppError> {
        self.repository.delete(office_id).await?;
        Ok(ApiResponse::success_with_message(
            (),
            "Oficina eliminada exitosamente".to_string(),
        ))
    }
}
