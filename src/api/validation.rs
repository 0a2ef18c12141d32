use super::ApiError;
use crate::domain::SensitiveAction;

pub fn validate_id(id: i32, resource: &str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "ID de {resource} inválido: {id}"
        )));
    }
    Ok(id)
}

pub fn parse_action(action: &str) -> Result<SensitiveAction, ApiError> {
    action.trim().parse().map_err(|_| {
        let known: Vec<&str> = SensitiveAction::ALL.iter().map(|a| a.as_str()).collect();
        ApiError::validation(format!(
            "Acción desconocida '{action}'. Valores válidos: {}",
            known.join(", ")
        ))
    })
}

/// Codes are short digit strings; anything else cannot match and is
/// rejected before touching the attempt counter.
pub fn validate_code(code: &str) -> Result<&str, ApiError> {
    let code = code.trim();
    if code.is_empty() || code.len() > 12 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation("El código debe contener solo dígitos"));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1, "pedido").is_ok());
        assert!(validate_id(0, "pedido").is_err());
        assert!(validate_id(-3, "pedido").is_err());
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(
            parse_action(" admin_access ").unwrap(),
            SensitiveAction::AdminAccess
        );
        assert!(parse_action("launch_rockets").is_err());
    }

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code(" 123456 ").unwrap(), "123456");
        assert!(validate_code("12a456").is_err());
        assert!(validate_code("").is_err());
    }
}
