//! Saneamiento de texto para logs
//! 
//! Todo texto que llega desde fuera (mensajes de error, IP, user agent)
//! pasa por aquí antes de llegar al log para evitar inyección de líneas.

use lazy_static::lazy_static;
use regex::Regex;

/// Longitud máxima de un valor saneado antes de truncarlo
pub const MAX_LOG_FIELD_LEN: usize = 100;

lazy_static! {
    static ref CONTROL_CHARS: Regex = Regex::new(r"[\n\r\t\x00-\x1f\x7f]").unwrap();
}

/// Reemplaza caracteres de control por espacios y trunca a `MAX_LOG_FIELD_LEN`
pub fn sanitize_for_log(input: &str) -> String {
    let cleaned = CONTROL_CHARS.replace_all(input, " ");

    if cleaned.chars().count() > MAX_LOG_FIELD_LEN {
        let truncated: String = cleaned.chars().take(MAX_LOG_FIELD_LEN).collect();
        format!("{}...", truncated)
    } else {
        cleaned.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_line_breaks() {
        let input = "usuario\nINFO falso\r\tlog";
        assert_eq!(sanitize_for_log(input), "usuario INFO falso  log");
    }

    #[test]
    fn test_truncates_long_values() {
        let input = "a".repeat(250);
        let sanitized = sanitize_for_log(&input);
        assert_eq!(sanitized.len(), MAX_LOG_FIELD_LEN + 3);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn test_short_values_untouched() {
        assert_eq!(sanitize_for_log("192.168.1.10"), "192.168.1.10");
    }

    #[test]
    fn test_multibyte_truncation_is_char_safe() {
        let input = "é".repeat(120);
        let sanitized = sanitize_for_log(&input);
        assert_eq!(sanitized.chars().count(), MAX_LOG_FIELD_LEN + 3);
    }
}
