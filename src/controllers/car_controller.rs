use crate::dto::car_dto::{
    CarListQuery, CarListResponse, CarTypeRow, CreateCarRequest, CreateCarTypeRequest,
    UpdateCarRequest, UpdateCarTypeRequest,
};
use crate::dto::ApiResponse;
use crate::models::car::{Car, CarType};
use crate::repositories::{CarRepository, OfficeRepository};
use crate::utils::errors::AppError;
use crate::utils::validation;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

pub struct CarController {
    repository: CarRepository,
    offices: OfficeRepository,
}

impl CarController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CarRepository::new(pool.clone()),
            offices: OfficeRepository::new(pool),
        }
    }

    /// Listado público: solo coches disponibles, con presupuesto si
    /// vienen las fechas del tramo.
    pub async fn list_cars(
        &self,
        query: CarListQuery,
    ) -> Result<ApiResponse<CarListResponse>, AppError> {
        if let (Some(pickup), Some(dropoff)) = (query.pickup_datetime, query.dropoff_datetime) {
            if dropoff <= pickup {
                return Err(AppError::ValidationError(
                    "La devolución debe ser posterior a la recogida".to_string(),
                ));
            }
        }

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let (cars, total) = self.repository.list_with_quote(&query, false).await?;
        let total_pages = (total + per_page - 1) / per_page;

        Ok(ApiResponse::success(CarListResponse {
            cars,
            total,
            page,
            per_page,
            total_pages,
        }))
    }

    /// Listado administrativo: incluye coches fuera de servicio
    pub async fn list_all_cars(
        &self,
        query: CarListQuery,
    ) -> Result<ApiResponse<CarListResponse>, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let (cars, total) = self.repository.list_with_quote(&query, true).await?;
        let total_pages = (total + per_page - 1) / per_page;

        Ok(ApiResponse::success(CarListResponse {
            cars,
            total,
            page,
            per_page,
            total_pages,
        }))
    }

    pub async fn get_car(&self, car_id: Uuid) -> Result<ApiResponse<Car>, AppError> {
        let car = self
            .repository
            .find_by_id(car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Coche no encontrado".to_string()))?;

        Ok(ApiResponse::success(car))
    }

    pub async fn create_car(
        &self,
        request: CreateCarRequest,
    ) -> Result<ApiResponse<Car>, AppError> {
        request.validate()?;
        validation::validate_license_plate(&request.license_plate)
            .map_err(|e| validation::into_app_error("license_plate", e))?;
        validation::validate_positive(request.price_per_hour)
            .map_err(|e| validation::into_app_error("price_per_hour", e))?;
        validation::validate_positive(request.price_per_day)
            .map_err(|e| validation::into_app_error("price_per_day", e))?;

        if self
            .repository
            .find_type_by_id(request.car_type_id)
            .await?
            .is_none()
        {
            return Err(AppError::ValidationError(
                "El tipo de coche no existe".to_string(),
            ));
        }
        if self
            .offices
            .find_by_id(request.office_location_id)
            .await?
            .is_none()
        {
            return Err(AppError::ValidationError("La oficina no existe".to_string()));
        }

        let car = self.repository.create(&request).await?;
        log::info!("✅ Coche creado: {} ({})", car.model, car.license_plate);

        Ok(ApiResponse::success_with_message(
            car,
            "Coche creado exitosamente".to_string(),
        ))
    }

    pub async fn update_car(
        &self,
        car_id: Uuid,
        request: UpdateCarRequest,
    ) -> Result<ApiResponse<Car>, AppError> {
        if let Some(plate) = &request.license_plate {
            validation::validate_license_plate(plate)
                .map_err(|e| validation::into_app_error("license_plate", e))?;
        }
        if let Some(price) = request.price_per_hour {
            validation::validate_positive(price)
                .map_err(|e| validation::into_app_error("price_per_hour", e))?;
        }
        if let Some(price) = request.price_per_day {
            validation::validate_positive(price)
                .map_err(|e| validation::into_app_error("price_per_day", e))?;
        }

        let car = self.repository.update(car_id, &request).await?;
        Ok(ApiResponse::success_with_message(
            car,
            "Coche actualizado exitosamente".to_string(),
        ))
    }

    pub async fn delete_car(&self, car_id: Uuid) -> Result<ApiResponse<()>, AppError> {
        self.repository.delete(car_id).await?;
        log::info!("🗑️ Coche {} eliminado", car_id);

        Ok(ApiResponse::success_with_message(
            (),
            "Coche eliminado exitosamente".to_string(),
        ))
    }

    // ------------------------------------------------------------------
    // Tipos de coche
    // ------------------------------------------------------------------

    pub async fn list_car_types(&self) -> Result<ApiResponse<Vec<CarTypeRow>>, AppError> {
        let types = self.repository.list_types().await?;
        Ok(ApiResponse::success(types))
    }

    pub async fn create_car_type(
        &self,
        request: CreateCarTypeRequest,
    ) -> Result<ApiResponse<CarType>, AppError> {
        request.validate()?;

        let car_type = self.repository.create_type(&request).await?;
        Ok(ApiResponse::success_with_message(
            car_type,
            "Tipo de coche creado exitosamente".to_string(),
        ))
    }

    pub async fn update_car_type(
        &self,
        car_type_id: i32,
        request: UpdateCarTypeRequest,
    ) -> Result<ApiResponse<CarType>, AppError> {
        let car_type = self.repository.update_type(car_type_id, &request).await?;
        Ok(ApiResponse::success_with_message(
            car_type,
            "Tipo de coche actualizado exitosamente".to_string(),
        ))
    }

    pub async fn delete_car_type(&self, car_type_id: i32) -> Result<ApiResponse<()>, AppError> {
        self.repository.delete_type(car_type_id).await?;
        Ok(ApiResponse::success_with_message(
            (),
            "Tipo de coche eliminado exitosamente".to_string(),
        ))
    }
}
