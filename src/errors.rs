use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ip2LocError {
    InvalidIp(String),
    InvalidMethod(String),
    NotFound(String),
    DatabaseRead(String),
    DatabaseOpen(String),
    FileOperation(String),
    Watch(String),
    Config(String),
}

impl Ip2LocError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            Ip2LocError::InvalidIp(_) => "E001",
            Ip2LocError::InvalidMethod(_) => "E002",
            Ip2LocError::NotFound(_) => "E003",
            Ip2LocError::DatabaseRead(_) => "E004",
            Ip2LocError::DatabaseOpen(_) => "E005",
            Ip2LocError::FileOperation(_) => "E006",
            Ip2LocError::Watch(_) => "E007",
            Ip2LocError::Config(_) => "E008",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            Ip2LocError::InvalidIp(_) => "Invalid IP Address",
            Ip2LocError::InvalidMethod(_) => "Unsupported Database Method",
            Ip2LocError::NotFound(_) => "Record Not Found",
            Ip2LocError::DatabaseRead(_) => "Database Read Error",
            Ip2LocError::DatabaseOpen(_) => "Database Open Error",
            Ip2LocError::FileOperation(_) => "File Operation Error",
            Ip2LocError::Watch(_) => "File Watch Error",
            Ip2LocError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            Ip2LocError::InvalidIp(msg) => msg,
            Ip2LocError::InvalidMethod(msg) => msg,
            Ip2LocError::NotFound(msg) => msg,
            Ip2LocError::DatabaseRead(msg) => msg,
            Ip2LocError::DatabaseOpen(msg) => msg,
            Ip2LocError::FileOperation(msg) => msg,
            Ip2LocError::Watch(msg) => msg,
            Ip2LocError::Config(msg) => msg,
        }
    }

    /// 是否属于调用方输入问题（不记录为故障）
    pub fn is_client_error(&self) -> bool {
        matches!(self, Ip2LocError::InvalidIp(_) | Ip2LocError::NotFound(_))
    }

    /// 映射到 HTTP 状态码
    #[cfg(feature = "server")]
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            Ip2LocError::InvalidIp(_) => StatusCode::BAD_REQUEST,
            Ip2LocError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for Ip2LocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for Ip2LocError {}

// 便捷的构造函数
impl Ip2LocError {
    pub fn invalid_ip<T: Into<String>>(msg: T) -> Self {
        Ip2LocError::InvalidIp(msg.into())
    }

    pub fn invalid_method<T: Into<String>>(msg: T) -> Self {
        Ip2LocError::InvalidMethod(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Ip2LocError::NotFound(msg.into())
    }

    pub fn database_read<T: Into<String>>(msg: T) -> Self {
        Ip2LocError::DatabaseRead(msg.into())
    }

    pub fn database_open<T: Into<String>>(msg: T) -> Self {
        Ip2LocError::DatabaseOpen(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        Ip2LocError::FileOperation(msg.into())
    }

    pub fn watch<T: Into<String>>(msg: T) -> Self {
        Ip2LocError::Watch(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Ip2LocError::Config(msg.into())
    }
}

impl From<std::io::Error> for Ip2LocError {
    fn from(err: std::io::Error) -> Self {
        Ip2LocError::FileOperation(err.to_string())
    }
}

impl From<notify::Error> for Ip2LocError {
    fn from(err: notify::Error) -> Self {
        Ip2LocError::Watch(err.to_string())
    }
}

impl From<config::ConfigError> for Ip2LocError {
    fn from(err: config::ConfigError) -> Self {
        Ip2LocError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Ip2LocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            Ip2LocError::invalid_ip("a"),
            Ip2LocError::invalid_method("a"),
            Ip2LocError::not_found("a"),
            Ip2LocError::database_read("a"),
            Ip2LocError::database_open("a"),
            Ip2LocError::file_operation("a"),
            Ip2LocError::watch("a"),
            Ip2LocError::config("a"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_format_simple() {
        let err = Ip2LocError::invalid_ip("not-an-ip is not a valid ip address");
        assert_eq!(
            err.to_string(),
            "Invalid IP Address: not-an-ip is not a valid ip address"
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Ip2LocError::invalid_ip("x").is_client_error());
        assert!(Ip2LocError::not_found("x").is_client_error());
        assert!(!Ip2LocError::invalid_method("x").is_client_error());
        assert!(!Ip2LocError::database_read("x").is_client_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Ip2LocError = io.into();
        assert_eq!(err.code(), "E006");
        assert!(err.message().contains("missing"));
    }
}
