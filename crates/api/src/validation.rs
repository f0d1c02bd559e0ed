use crate::error::ApiError;

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const PASSWORD_MIN_LENGTH: usize = 6;

pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
        && !value.chars().any(char::is_whitespace)
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn not_empty(mut self, value: Option<&str>, message: &str) -> Self {
        if value.is_none_or(|v| v.trim().is_empty()) {
            self.errors.push(message.to_string());
        }
        self
    }

    pub fn min_length(mut self, value: Option<&str>, min: usize, message: &str) -> Self {
        if value.is_some_and(|v| !v.is_empty() && v.chars().count() < min) {
            self.errors.push(message.to_string());
        }
        self
    }

    pub fn email(mut self, value: Option<&str>, required: bool, message: &str) -> Self {
        let valid = match value {
            None | Some("") => !required,
            Some(v) => is_email(v),
        };
        if !valid {
            self.errors.push(message.to_string());
        }
        self
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_email("jdoe@example.com"));
        assert!(is_email("j.doe+tag@mail.example.org"));
        assert!(!is_email("jdoe"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("jdoe@localhost"));
        assert!(!is_email("jdoe@@example.com"));
        assert!(!is_email("j doe@example.com"));
    }

    #[test]
    fn validator_collects_all_errors() {
        let result = Validator::new()
            .not_empty(None, "Invalid Username")
            .min_length(Some("abc"), PASSWORD_MIN_LENGTH, "Invalid Password (Minimum size error)")
            .email(Some("nope"), false, "Invalid Email")
            .finish();

        match result {
            Err(ApiError::Validation(errors)) => assert_eq!(
                errors,
                vec![
                    "Invalid Username",
                    "Invalid Password (Minimum size error)",
                    "Invalid Email"
                ]
            ),
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn optional_email_may_be_absent() {
        assert!(Validator::new().email(None, false, "Invalid Email").finish().is_ok());
        assert!(Validator::new().email(Some(""), true, "Invalid Email").finish().is_err());
    }
}
