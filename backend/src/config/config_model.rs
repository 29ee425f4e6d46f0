use checkout_core::domain::value_objects::enums::gateway_kinds::GatewayKind;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub payment: Payment,
    pub notification: Notification,
    pub internal: Internal,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub enabled: bool,
    pub provider: GatewayKind,
    /// Public base URL gateways call back into, e.g. `https://api.example.com`.
    pub callback_base_url: Option<String>,
    pub gateway_timeout_secs: u64,
    pub midtrans: Midtrans,
    pub duitku: Duitku,
}

#[derive(Debug, Clone)]
pub struct Midtrans {
    pub server_key: String,
    pub client_key: String,
    pub is_production: bool,
}

#[derive(Debug, Clone)]
pub struct Duitku {
    pub merchant_code: String,
    pub merchant_key: String,
    pub is_production: bool,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub whatsapp_url: Option<String>,
    pub whatsapp_api_key: Option<String>,
    pub frontend_url: String,
}

#[derive(Debug, Clone)]
pub struct Internal {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserSecret {
    pub secret: String,
}
