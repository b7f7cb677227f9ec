use std::sync::OnceLock;
use std::time::Duration;

static USER_AGENT: OnceLock<String> = OnceLock::new();

/// `User-Agent` annoncé aux passerelles : `<os> UPnP/1.1 pmonat/<version>`.
pub fn user_agent() -> &'static str {
    USER_AGENT.get_or_init(|| {
        format!(
            "{} UPnP/1.1 pmonat/{}",
            pmoutils::get_os_string(),
            env!("CARGO_PKG_VERSION")
        )
    })
}

/// Construit un client HTTP borné par `timeout`.
pub(crate) fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_the_crate() {
        let ua = user_agent();
        assert!(ua.contains(" UPnP/1.1 pmonat/"));
        assert!(ua.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
