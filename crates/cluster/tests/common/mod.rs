use deepfreeze_cluster::HttpCluster;
use deepfreeze_core::config::ClusterConfig;
use httpmock::MockServer;
use std::net::TcpListener;

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Client pointed at `server` with basic auth.
#[allow(dead_code)]
pub fn client_for(server: &MockServer) -> HttpCluster {
    let config = ClusterConfig {
        url: server.base_url(),
        username: Some("elastic".to_string()),
        password: Some("changeme".to_string()),
        timeout_secs: 5,
        ..ClusterConfig::default()
    };
    HttpCluster::new(&config).expect("client should build")
}
