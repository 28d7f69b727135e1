//! Generación de números de ticket
//!
//! El ticket es la referencia que el cliente presenta en mostrador:
//! CRyymmdd-XXXXXX, con sufijo aleatorio alfanumérico en mayúsculas.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::repositories::BookingRepository;
use crate::utils::errors::AppError;

pub fn generate_ticket_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();

    format!("CR{}-{}", now.format("%y%m%d"), suffix)
}

/// Genera un ticket que no exista todavía. Con 36^6 sufijos posibles
/// las colisiones son raras, pero se reintenta por si acaso.
pub async fn unique_ticket_number(repo: &BookingRepository) -> Result<String, AppError> {
    for _ in 0..5 {
        let candidate = generate_ticket_number(Utc::now());
        if !repo.ticket_exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(AppError::Internal(
        "Could not generate a unique ticket number".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ticket_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let ticket = generate_ticket_number(now);

        assert!(ticket.starts_with("CR240315-"));
        assert_eq!(ticket.len(), 15);
    }

    #[test]
    fn test_ticket_suffix_is_uppercase_alphanumeric() {
        let ticket = generate_ticket_number(Utc::now());
        let suffix = &ticket[9..];

        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_ticket_passes_validation() {
        let ticket = generate_ticket_number(Utc::now());
        assert!(crate::utils::validation::validate_ticket_number(&ticket).is_ok());
    }

    #[test]
    fn test_tickets_differ() {
        let a = generate_ticket_number(Utc::now());
        let b = generate_ticket_number(Utc::now());
        assert_ne!(a, b);
    }
}
