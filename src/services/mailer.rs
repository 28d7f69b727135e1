//! Envío de correos transaccionales
//!
//! Si no hay SMTP_HOST configurado el mailer arranca deshabilitado y
//! los envíos se registran en el log sin fallar.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EnvironmentConfig;
use crate::utils::errors::AppError;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), AppError>;
}

pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &EnvironmentConfig) -> Self {
        let from: Mailbox = config
            .mail_from
            .clone()
            .unwrap_or_else(|| "Journey Wheel <no-reply@journeywheel.com>".to_string())
            .parse()
            .expect("MAIL_FROM must be a valid mailbox");

        let transport = match &config.smtp_host {
            Some(host) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .expect("Failed to create SMTP transport")
                    .port(config.smtp_port);

                if let (Some(username), Some(password)) =
                    (&config.smtp_username, &config.smtp_password)
                {
                    builder = builder
                        .credentials(Credentials::new(username.clone(), password.clone()));
                }

                Some(builder.build())
            }
            None => {
                log::warn!("📧 SMTP_HOST no configurado, el envío de correos queda deshabilitado");
                None
            }
        };

        Self { transport, from }
    }

    /// Mailer apagado, útil en tests
    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: "Journey Wheel <no-reply@journeywheel.com>"
                .parse()
                .expect("static mailbox"),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), AppError> {
        let transport = match &self.transport {
            Some(t) => t,
            None => {
                log::debug!("📧 Correo omitido (SMTP deshabilitado): {} -> {}", subject, to);
                return Ok(());
            }
        };

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Internal(format!("Error building email: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::Internal(format!("Error sending email: {}", e)))?;

        log::info!("📧 Correo enviado: {} -> {}", subject, to);
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Plantillas
// ----------------------------------------------------------------------

pub fn welcome_email(name: &str) -> (String, String) {
    let subject = "¡Tu cuenta se ha creado correctamente!".to_string();
    let body = format!(
        "Hola {},\n\n\
         Bienvenido a Journey Wheel. Tu cuenta ya está activa y puedes\n\
         reservar cualquier coche de nuestra flota.\n\n\
         ¡Buen viaje!\n\
         El equipo de Journey Wheel",
        name
    );
    (subject, body)
}

pub fn staff_credentials_email(name: &str, email: &str, temp_password: &str) -> (String, String) {
    let subject = "Tu cuenta de empleado en Journey Wheel".to_string();
    let body = format!(
        "Hola {},\n\n\
         Se ha creado tu cuenta de empleado.\n\n\
         Usuario: {}\n\
         Contraseña temporal: {}\n\n\
         Debes cambiar esta contraseña inmediatamente después de tu\n\
         primer acceso.\n\n\
         El equipo de Journey Wheel",
        name, email, temp_password
    );
    (subject, body)
}

pub fn booking_confirmation_email(
    name: &str,
    ticket_number: &str,
    car_model: &str,
    pickup_datetime: DateTime<Utc>,
) -> (String, String) {
    let subject = format!("Reserva {} registrada", ticket_number);
    let body = format!(
        "Hola {},\n\n\
         Tu reserva quedó registrada.\n\n\
         Ticket: {}\n\
         Coche: {}\n\
         Recogida: {}\n\n\
         Presenta el número de ticket en el mostrador o al repartidor.\n\n\
         El equipo de Journey Wheel",
        name,
        ticket_number,
        car_model,
        pickup_datetime.format("%d/%m/%Y %H:%M UTC")
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_welcome_email_mentions_user() {
        let (subject, body) = welcome_email("Aung");
        assert!(subject.contains("cuenta"));
        assert!(body.contains("Aung"));
        assert!(body.contains("Journey Wheel"));
    }

    #[test]
    fn test_staff_credentials_email_contains_password() {
        let (_, body) = staff_credentials_email("Su Su", "susu@journeywheel.com", "Xk9!mQ2p");
        assert!(body.contains("susu@journeywheel.com"));
        assert!(body.contains("Xk9!mQ2p"));
        assert!(body.contains("cambiar esta contraseña"));
    }

    #[test]
    fn test_booking_confirmation_contains_ticket() {
        let pickup = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let (subject, body) = booking_confirmation_email("Aung", "CR240601-A1B2C3", "Toyota Vios", pickup);
        assert!(subject.contains("CR240601-A1B2C3"));
        assert!(body.contains("Toyota Vios"));
        assert!(body.contains("01/06/2024"));
    }
}
