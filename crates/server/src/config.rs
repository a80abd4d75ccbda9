#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub tick_rate: u32,
    pub players: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: skirmish::DEFAULT_PORT,
            tick_rate: skirmish::DEFAULT_TICK_RATE,
            players: 2,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
