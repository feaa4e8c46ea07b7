/// Schema version written at the top of a fresh manifest.
pub const COMPOSE_SCHEMA_VERSION: &str = "3.8";
pub const COMPOSE_FILENAME: &str = "docker-compose.yml";
pub const ENV_FILENAME: &str = ".env";
pub const VOLUMES_DIR: &str = "volumes";

pub const IMAGE_TRAEFIK: &str = "registry.hav.media/aura_odoo/traefik:v2.10";
pub const IMAGE_ODOO: &str = "registry.hav.media/aura_odoo/odoo";
pub const IMAGE_KWKHTMLTOPDF: &str = "registry.hav.media/aura_odoo/kwkhtmltopdf:0.12.5";
pub const IMAGE_POSTGRES: &str = "registry.hav.media/aura_odoo/postgres:15-alpine";

pub const PROXY_SERVICE: &str = "proxy";
pub const DB_SERVICE: &str = "db";
pub const PDF_SERVICE: &str = "kwkhtmltopdf";
pub const LIVE_SERVICE: &str = "live";
pub const PRE_SERVICE: &str = "pre";
pub const DEV_SERVICE_PREFIX: &str = "odoo_dev_pr";

pub const POSTGRES_PORT: u16 = 5432;
pub const POSTGRES_USER: &str = "postgres";
pub const POSTGRES_DB: &str = "postgres";

pub const ACME_EMAIL: &str = "accounts@hav.media";
pub const CERT_RESOLVER: &str = "main_resolver";

pub const ODOO_HTTP_PORT: u16 = 8069;
pub const ODOO_WEBSOCKET_PORT: u16 = 8072;

/// Env file keys.
pub mod keys {
  pub const DEV: &str = "DEV";
  pub const MODULE_MODE: &str = "MODULE_MODE";
  pub const DOMAIN: &str = "DOMAIN";
  pub const VERSION: &str = "VERSION";
  pub const MASTER_DB_PASSWORD: &str = "MASTER_DB_PASSWORD";
}

pub const MODULE_MODE_INCLUDED: &str = "included";
pub const MODULE_MODE_MOUNTED: &str = "mounted";

/// Number of random bytes behind every generated password.
pub const PASSWORD_BYTES: usize = 32;

/// Directory inside the database container that receives temporary dumps.
pub const DUMP_DIR: &str = "/tmp";

/// Path of the module sources inside an application container.
pub const ODOO_SRC_PATH: &str = "/odoo/src/";
