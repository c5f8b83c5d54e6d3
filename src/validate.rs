//! Client-side form checks. These only gate buttons; they never produce errors.

/// Minimum password length is strictly greater than this.
pub const PASSWORD_MIN_EXCLUSIVE: usize = 16;

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Loose shape check: `something@something.something` on a single line.
pub fn validate_email(email: &str) -> bool {
    if email.chars().any(is_line_break) {
        return false;
    }
    let chars: Vec<char> = email.chars().collect();
    let Some(at) = chars.iter().skip(1).position(|&c| c == '@').map(|i| i + 1) else {
        return false;
    };
    // a dot with at least one char on each side, after the first char of the domain
    chars
        .iter()
        .enumerate()
        .any(|(i, &c)| c == '.' && i >= at + 2 && i + 1 < chars.len())
}

pub fn validate_password(password: &str) -> bool {
    password.chars().count() > PASSWORD_MIN_EXCLUSIVE
}

#[inline]
pub fn required(value: &str) -> bool {
    !value.trim().is_empty()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub is_loading: bool,
}

impl LoginForm {
    pub fn can_login(&self) -> bool {
        validate_email(&self.email) && validate_password(&self.password) && !self.is_loading
    }

    /// Sign-up only takes an email; a typed password means the user meant to log in.
    pub fn can_sign_up(&self) -> bool {
        validate_email(&self.email) && self.password.is_empty() && !self.is_loading
    }

    pub fn can_recover(&self) -> bool {
        validate_email(&self.email) && !self.is_loading
    }
}
