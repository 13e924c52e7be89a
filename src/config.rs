use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Which strategy supplies seasonal factors and growth trends for cash-flow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendModelKind {
    /// Fixed neutral factors that do not look at the data.
    #[default]
    Placeholder,
    /// Seasonal indices and growth rates derived from monthly history.
    Historical,
}

impl FromStr for TrendModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "historical" => Ok(Self::Historical),
            other => Err(format!("unknown trend model '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub migrations_path: PathBuf,
    pub trend_model: TrendModelKind,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let trend_model = match env::var("SMARTFIN_TREND_MODEL") {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!("{}, falling back to placeholder trends", e);
                TrendModelKind::Placeholder
            }),
            Err(_) => TrendModelKind::Placeholder,
        };

        Self {
            host: env::var("SMARTFIN_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("SMARTFIN_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(7070),
            database_path: env::var("SMARTFIN_DATABASE_URL")
                .map(|v| {
                    PathBuf::from(
                        v.strip_prefix("sqlite://")
                            .or_else(|| v.strip_prefix("sqlite:"))
                            .unwrap_or(&v),
                    )
                })
                .unwrap_or_else(|_| PathBuf::from("data/smartfin.db")),
            migrations_path: env::var("SMARTFIN_MIGRATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("migrations")),
            trend_model,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
