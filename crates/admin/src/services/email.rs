//! Order notification e-mails.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain-text
//! templates. Only built when the SMTP settings are present.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use jouwwinkel_core::OrderStatus;
use jouwwinkel_core::Price;
use jouwwinkel_core::models::Order;

use crate::config::SmtpConfig;

/// What every order e-mail shows.
#[derive(Debug, Clone)]
pub struct OrderMail {
    pub store_name: String,
    pub order_number: String,
    pub customer_name: String,
    pub total: String,
    /// The order page in the customer's account.
    pub order_url: String,
}

impl OrderMail {
    #[must_use]
    pub fn new(order: &Order, store_name: &str, order_url: String) -> Self {
        Self {
            store_name: store_name.to_owned(),
            order_number: order.order_number(),
            customer_name: order.address.full_name.clone(),
            total: Price::eur(order.total).to_string(),
            order_url,
        }
    }
}

/// Carrier details for the shipped e-mail.
#[derive(Debug, Clone)]
pub struct Shipment {
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
}

#[derive(Template)]
#[template(path = "email/order_confirmed.html")]
struct OrderConfirmedHtml<'a> {
    mail: &'a OrderMail,
}

#[derive(Template)]
#[template(path = "email/order_confirmed.txt")]
struct OrderConfirmedText<'a> {
    mail: &'a OrderMail,
}

#[derive(Template)]
#[template(path = "email/order_shipped.html")]
struct OrderShippedHtml<'a> {
    mail: &'a OrderMail,
    shipment: &'a Shipment,
}

#[derive(Template)]
#[template(path = "email/order_shipped.txt")]
struct OrderShippedText<'a> {
    mail: &'a OrderMail,
    shipment: &'a Shipment,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.html")]
struct OrderCancelledHtml<'a> {
    mail: &'a OrderMail,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.txt")]
struct OrderCancelledText<'a> {
    mail: &'a OrderMail,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_owned(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Tell the customer their order was confirmed.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to render or send.
    pub async fn send_order_confirmed(&self, to: &str, mail: &OrderMail) -> Result<(), EmailError> {
        let (subject, text, html) = render_confirmed(mail)?;
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Tell the customer their order is on its way.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to render or send.
    pub async fn send_order_shipped(
        &self,
        to: &str,
        mail: &OrderMail,
        shipment: &Shipment,
    ) -> Result<(), EmailError> {
        let (subject, text, html) = render_shipped(mail, shipment)?;
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Tell the customer their order was cancelled.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to render or send.
    pub async fn send_order_cancelled(&self, to: &str, mail: &OrderMail) -> Result<(), EmailError> {
        let (subject, text, html) = render_cancelled(mail)?;
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_owned()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_owned()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_owned()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Which status changes the customer hears about.
#[must_use]
pub const fn notifies_customer(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Confirmed | OrderStatus::Shipped | OrderStatus::Cancelled
    )
}

type Rendered = (String, String, String);

fn render_confirmed(mail: &OrderMail) -> Result<Rendered, EmailError> {
    Ok((
        format!("{}: order {} confirmed", mail.store_name, mail.order_number),
        OrderConfirmedText { mail }.render()?,
        OrderConfirmedHtml { mail }.render()?,
    ))
}

fn render_shipped(mail: &OrderMail, shipment: &Shipment) -> Result<Rendered, EmailError> {
    Ok((
        format!("{}: order {} is on its way", mail.store_name, mail.order_number),
        OrderShippedText { mail, shipment }.render()?,
        OrderShippedHtml { mail, shipment }.render()?,
    ))
}

fn render_cancelled(mail: &OrderMail) -> Result<Rendered, EmailError> {
    Ok((
        format!("{}: order {} cancelled", mail.store_name, mail.order_number),
        OrderCancelledText { mail }.render()?,
        OrderCancelledHtml { mail }.render()?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mail() -> OrderMail {
        OrderMail {
            store_name: "Jouwwinkel".to_owned(),
            order_number: "JW-000042".to_owned(),
            customer_name: "Sanne de Vries".to_owned(),
            total: "€41.45".to_owned(),
            order_url: "https://shop.example.nl/account/orders/42".to_owned(),
        }
    }

    #[test]
    fn test_shipped_mail_includes_tracking_link() {
        let shipment = Shipment {
            carrier: "PostNL".to_owned(),
            tracking_number: "3SABCD1234567".to_owned(),
            tracking_url: Some("https://postnl.example/track/3SABCD1234567".to_owned()),
        };
        let (subject, text, html) = render_shipped(&mail(), &shipment).unwrap();
        assert!(subject.contains("JW-000042"));
        assert!(text.contains("3SABCD1234567"));
        assert!(text.contains("https://postnl.example/track/3SABCD1234567"));
        assert!(html.contains("href=\"https://postnl.example/track/3SABCD1234567\""));
    }

    #[test]
    fn test_shipped_mail_without_tracking_url() {
        let shipment = Shipment {
            carrier: "Eigen bezorging".to_owned(),
            tracking_number: "R-17".to_owned(),
            tracking_url: None,
        };
        let (_, text, html) = render_shipped(&mail(), &shipment).unwrap();
        assert!(text.contains("R-17"));
        assert!(!html.contains("Track your parcel"));
    }

    #[test]
    fn test_confirmed_and_cancelled_mails() {
        let (subject, text, html) = render_confirmed(&mail()).unwrap();
        assert!(subject.ends_with("confirmed"));
        assert!(text.contains("Sanne de Vries"));
        assert!(html.contains("€41.45"));

        let (subject, text, _) = render_cancelled(&mail()).unwrap();
        assert!(subject.ends_with("cancelled"));
        assert!(text.contains("JW-000042"));
    }

    #[test]
    fn test_notified_statuses() {
        assert!(notifies_customer(OrderStatus::Confirmed));
        assert!(notifies_customer(OrderStatus::Shipped));
        assert!(notifies_customer(OrderStatus::Cancelled));
        assert!(!notifies_customer(OrderStatus::Processing));
        assert!(!notifies_customer(OrderStatus::Delivered));
    }
}
