use clap::Parser;
use serde::{Deserialize, Serialize};

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file.
     */
    #[arg(short, long)]
    pub config_file: String,
    /**
     * Optional CSV file with school leaver records to import at startup.
     */
    #[arg(long)]
    pub import_file: Option<String>,
    /**
     * Whether the import file starts with a header row.
     */
    #[arg(long, default_value_t = false)]
    pub import_has_header: bool,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Authentication configuration for the application.
     */
    pub auth: AuthConfig,
    /**
     * Server configuration for the application.
     */
    pub server: Server,
    /**
     * Database configuration for the application.
     */
    pub database: Database,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Additional directives for logging configuration.
     */
    pub directives: Vec<String>,
}

impl LoggingConfig {
    #[allow(dead_code)]
    pub fn default() -> Self {
        LoggingConfig { target: true, thread_ids: true, line_number: true, level: true, ansi: true, directives: vec![] }
    }
}

/**
 * Authentication configuration. The default user is seeded at startup when
 * no row with that username exists.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /**
     * Username of the seeded default user.
     */
    pub default_username: String,
    /**
     * Password of the seeded default user, stored as-is.
     */
    pub default_password: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /**
     * Type of the database (e.g., `PostgreSQL`).
     */
    pub db_type: DatabaseType,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    /**
     * `PostgreSQL` database type.
     */
    #[serde(rename_all = "camelCase")]
    Postgresql { connection_string: String, max_connections: u32, min_connections: u32, acquire_timeout: u64, acquire_slow_threshold: u64, idle_timeout: u64, max_lifetime: u64 },
}

/**
 * Represents the server configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /**
     * Number of worker threads for the server.
     */
    pub workers: usize,
    /**
     * HTTP port for the server.
     */
    pub http_port: Option<u16>,
    /**
     * HTTPS configuration for the server.
     */
    pub https_config: Option<HttpsConfig>,
}

/**
 * Represents the HTTPS configuration for the server.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsConfig {
    /**
     * Port for the HTTPS server.
     */
    pub port: u16,
    /**
     * Path to the certificate file.
     */
    pub certificate_file: String,
    /**
     * Path to the private key file.
     */
    pub private_key_file: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config {
            logging: LoggingConfig::default(),
            auth: AuthConfig { default_username: "CCT1234".to_string(), default_password: "54321".to_string() },
            database: Database {
                db_type: DatabaseType::Postgresql {
                    connection_string: "postgres://localhost/school_leavers".to_string(),
                    max_connections: 5,
                    min_connections: 1,
                    acquire_timeout: 30,
                    acquire_slow_threshold: 60,
                    idle_timeout: 300,
                    max_lifetime: 3600,
                },
            },
            server: Server { workers: 4, http_port: Some(8080), https_config: None },
        };
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.auth.default_username, "CCT1234");
        assert_eq!(deserialized.auth.default_password, "54321");
        assert_eq!(deserialized.server.workers, 4);
        assert_eq!(deserialized.server.http_port, Some(8080));
        assert!(deserialized.server.https_config.is_none());
        let DatabaseType::Postgresql { max_connections, .. } = deserialized.database.db_type;
        assert_eq!(max_connections, 5);
    }

    #[test]
    fn test_config_parses_https_section() {
        let toml_str = r#"
            [logging]
            target = true
            thread_ids = false
            line_number = false
            level = true
            ansi = false
            directives = ["school_leavers_api=debug"]

            [auth]
            defaultUsername = "CCT1234"
            defaultPassword = "54321"

            [server]
            workers = 2
            [server.httpsConfig]
            port = 8443
            certificateFile = "/etc/certs/server.pem"
            privateKeyFile = "/etc/certs/server.key"

            [database.dbType.postgresql]
            connectionString = "postgres://localhost/school_leavers"
            maxConnections = 5
            minConnections = 1
            acquireTimeout = 30
            acquireSlowThreshold = 60
            idleTimeout = 300
            maxLifetime = 3600
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let https = config.server.https_config.unwrap();
        assert_eq!(https.port, 8443);
        assert!(config.server.http_port.is_none());
    }
}
