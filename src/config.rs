use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,

    /// Directory where profile pictures and leave documents are stored.
    pub upload_dir: String,

    /// Country code prepended to local parent phone numbers, e.g. "+94".
    pub default_country_code: String,

    // Twilio (WhatsApp + SMS). Channels without credentials are skipped.
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_whatsapp_from: Option<String>,
    pub twilio_sms_from: Option<String>,

    // SMTP credentials for the email channel.
    pub smtp_host: Option<String>,
    pub email_user: Option<String>,
    pub email_pass: Option<String>,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_api_per_min: u32,

    /// Comma-separated list of allowed CORS origins.
    pub cors_origins: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),

            default_country_code: env::var("DEFAULT_PHONE_COUNTRY_CODE")
                .unwrap_or_else(|_| "+94".to_string()),

            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").ok(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").ok(),
            twilio_whatsapp_from: env::var("TWILIO_WHATSAPP_FROM").ok(),
            twilio_sms_from: env::var("TWILIO_PHONE_NUMBER").ok(),

            smtp_host: env::var("SMTP_HOST").ok(),
            email_user: env::var("EMAIL_USER").ok(),
            email_pass: env::var("EMAIL_PASS").ok(),

            rate_login_per_min: env::var("RATE_LOGIN_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_api_per_min: env::var("RATE_API_PER_MIN")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap(),

            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:3001".to_string()),
        }
    }
}
