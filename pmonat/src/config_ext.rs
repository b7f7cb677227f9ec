//! Extension pour intégrer la configuration NAT dans pmoconfig
//!
//! Ce module fournit la structure [`NatConfig`], qui porte toutes les
//! constantes du protocole (fenêtre SSDP, timeouts, nombre de tentatives),
//! et le trait [`NatConfigExt`] qui la lit depuis la section `nat:` de
//! `pmoconfig::Config`.

use std::time::Duration;

use pmoconfig::Config;

const DEFAULT_SEARCH_WAIT_SECS: u64 = 1;
const DEFAULT_MULTICAST_TTL: u64 = 2;
const DEFAULT_DESCRIPTION_TIMEOUT_MS: u64 = 3000;
const DEFAULT_SOAP_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_PORT_MAPPING_ATTEMPTS: u64 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;
const DEFAULT_FALLBACK_GRACE_MS: u64 = 300;

/// Description posée sur les redirections de port quand l'appelant n'en
/// fournit pas.
pub const DEFAULT_MAPPING_DESCRIPTION: &str = "pmonat";

/// Paramètres de la découverte et du contrôle des passerelles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatConfig {
    /// Fenêtre de recherche SSDP, envoyée comme valeur `MX`.
    pub search_wait: Duration,
    pub multicast_ttl: u32,
    pub description_timeout: Duration,
    pub soap_timeout: Duration,
    pub port_mapping_attempts: u32,
    pub retry_backoff: Duration,
    /// Attente maximale du résultat de la recherche `ssdp:all`
    /// quand les recherches ciblées n'ont rien trouvé.
    pub fallback_grace: Duration,
    pub mapping_description: String,
}

impl Default for NatConfig {
    fn default() -> Self {
        Self {
            search_wait: Duration::from_secs(DEFAULT_SEARCH_WAIT_SECS),
            multicast_ttl: DEFAULT_MULTICAST_TTL as u32,
            description_timeout: Duration::from_millis(DEFAULT_DESCRIPTION_TIMEOUT_MS),
            soap_timeout: Duration::from_millis(DEFAULT_SOAP_TIMEOUT_MS),
            port_mapping_attempts: DEFAULT_PORT_MAPPING_ATTEMPTS as u32,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            fallback_grace: Duration::from_millis(DEFAULT_FALLBACK_GRACE_MS),
            mapping_description: DEFAULT_MAPPING_DESCRIPTION.to_string(),
        }
    }
}

impl NatConfig {
    /// Fenêtre de recherche en secondes entières, jamais inférieure à 1.
    pub fn search_wait_secs(&self) -> u32 {
        self.search_wait.as_secs().clamp(1, u32::MAX as u64) as u32
    }
}

/// Trait d'extension pour ajouter la configuration NAT à pmoconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::get_config;
/// use pmonat::NatConfigExt;
///
/// let nat_config = get_config().get_nat_config();
/// ```
pub trait NatConfigExt {
    /// Lit la section `nat:`, en retombant sur les valeurs par défaut
    /// pour chaque clé absente ou invalide.
    fn get_nat_config(&self) -> NatConfig;

    /// Écrit la configuration dans la section `nat:`.
    fn set_nat_config(&self, nat: &NatConfig) -> anyhow::Result<()>;
}

impl NatConfigExt for Config {
    fn get_nat_config(&self) -> NatConfig {
        let millis = |key: &str, default: u64| {
            Duration::from_millis(self.get_u64(&["nat", key], default))
        };

        let attempts = self
            .get_u64(&["nat", "port_mapping_attempts"], DEFAULT_PORT_MAPPING_ATTEMPTS)
            .max(1);

        NatConfig {
            search_wait: Duration::from_secs(
                self.get_u64(&["nat", "search_wait_secs"], DEFAULT_SEARCH_WAIT_SECS)
                    .max(1),
            ),
            multicast_ttl: self
                .get_u64(&["nat", "multicast_ttl"], DEFAULT_MULTICAST_TTL)
                .min(255) as u32,
            description_timeout: millis("description_timeout_ms", DEFAULT_DESCRIPTION_TIMEOUT_MS),
            soap_timeout: millis("soap_timeout_ms", DEFAULT_SOAP_TIMEOUT_MS),
            port_mapping_attempts: attempts.min(u32::MAX as u64) as u32,
            retry_backoff: millis("retry_backoff_ms", DEFAULT_RETRY_BACKOFF_MS),
            fallback_grace: millis("fallback_grace_ms", DEFAULT_FALLBACK_GRACE_MS),
            mapping_description: self.get_string(
                &["nat", "mapping_description"],
                DEFAULT_MAPPING_DESCRIPTION,
            ),
        }
    }

    fn set_nat_config(&self, nat: &NatConfig) -> anyhow::Result<()> {
        self.set_u64(&["nat", "search_wait_secs"], nat.search_wait.as_secs())?;
        self.set_u64(&["nat", "multicast_ttl"], nat.multicast_ttl as u64)?;
        self.set_u64(
            &["nat", "description_timeout_ms"],
            nat.description_timeout.as_millis() as u64,
        )?;
        self.set_u64(&["nat", "soap_timeout_ms"], nat.soap_timeout.as_millis() as u64)?;
        self.set_u64(
            &["nat", "port_mapping_attempts"],
            nat.port_mapping_attempts as u64,
        )?;
        self.set_u64(&["nat", "retry_backoff_ms"], nat.retry_backoff.as_millis() as u64)?;
        self.set_u64(&["nat", "fallback_grace_ms"], nat.fallback_grace.as_millis() as u64)?;
        self.set_value(
            &["nat", "mapping_description"],
            serde_yaml::Value::String(nat.mapping_description.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &std::path::Path) -> Config {
        Config::load_config(dir.to_str().unwrap()).unwrap()
    }

    #[test]
    fn embedded_defaults_match_protocol_constants() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(dir.path());
        assert_eq!(config.get_nat_config(), NatConfig::default());
    }

    #[test]
    fn zero_attempts_and_window_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(dir.path());
        config.set_u64(&["nat", "port_mapping_attempts"], 0).unwrap();
        config.set_u64(&["nat", "search_wait_secs"], 0).unwrap();

        let nat = config.get_nat_config();
        assert_eq!(nat.port_mapping_attempts, 1);
        assert_eq!(nat.search_wait, Duration::from_secs(1));
    }

    #[test]
    fn set_then_get_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(dir.path());
        let nat = NatConfig {
            search_wait: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(10),
            mapping_description: "demo".to_string(),
            ..NatConfig::default()
        };
        config.set_nat_config(&nat).unwrap();
        assert_eq!(config.get_nat_config(), nat);
    }
}
