use std::net::Ipv4Addr;
use std::time::Duration;

const NODE_PORT: &str = "NODE_PORT";

const DEFAULT_PORT: u16 = 51243;

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(NODE_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const NODE_ADDR: &str = "NODE_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(NODE_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

const NODE_SECRET: &str = "NODE_SECRET";

pub fn get_secret() -> Option<String> {
    std::env::var(NODE_SECRET).ok()
}

const HUB_URL: &str = "HUB_URL";

/// Base URL of the hub that receives counter reports
pub fn get_hub_url() -> Option<String> {
    std::env::var(HUB_URL)
        .ok()
        .map(|url| url.trim_end_matches('/').to_string())
}

const HUB_TOKEN: &str = "HUB_TOKEN";

pub fn get_hub_token() -> Option<String> {
    std::env::var(HUB_TOKEN).ok()
}

const NODE_ADVERTISED_ADDRESS: &str = "NODE_ADVERTISED_ADDRESS";

/// Address under which the hub knows this node
pub fn get_advertised_address() -> String {
    std::env::var(NODE_ADVERTISED_ADDRESS).unwrap_or_else(|_| {
        let host = sysinfo::System::host_name().unwrap_or_else(|| "localhost".to_string());
        format!("{host}:{}", get_port())
    })
}

const COUNTER_REPORT_INTERVAL: &str = "COUNTER_REPORT_INTERVAL_SECS";

const DEFAULT_COUNTER_REPORT_INTERVAL: u64 = 10;

pub fn get_counter_report_interval() -> Duration {
    let secs = std::env::var(COUNTER_REPORT_INTERVAL)
        .ok()
        .and_then(|res| res.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_COUNTER_REPORT_INTERVAL);
    Duration::from_secs(secs)
}
