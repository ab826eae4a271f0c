use crate::utils::error::{Result, VerifyError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    // Placeholders such as {pan} are filled per row, so validate the
    // template with them stripped.
    let template = strip_placeholders(url_str);

    match Url::parse(&template) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(VerifyError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

fn strip_placeholders(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut depth = 0usize;
    for ch in template.chars() {
        match ch {
            '{' => {
                depth += 1;
                out.push('x');
            }
            '}' if depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            _ => out.push(ch),
        }
    }
    out
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Unsupported value. Valid values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("endpoint.url", "https://example.com").is_ok());
        assert!(validate_url("endpoint.url", "http://example.com").is_ok());
        assert!(validate_url("endpoint.url", "").is_err());
        assert!(validate_url("endpoint.url", "invalid-url").is_err());
        assert!(validate_url("endpoint.url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_url_accepts_placeholders() {
        assert!(validate_url(
            "endpoint.url",
            "https://api.example.com/companies/{regInput}/details"
        )
        .is_ok());
        assert!(validate_url("endpoint.status_url", "https://api.example.com/async/{job_id}").is_ok());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("processing.concurrent_requests", 5, 1).is_ok());
        assert!(validate_positive_number("processing.concurrent_requests", 0, 1).is_err());
    }

    #[test]
    fn test_validate_one_of() {
        assert!(validate_one_of("load.output_formats", "csv", &["csv", "tsv"]).is_ok());
        assert!(validate_one_of("load.output_formats", "xml", &["csv", "tsv"]).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("run.name", "batch").is_ok());
        assert!(validate_non_empty_string("run.name", "   ").is_err());
    }
}
