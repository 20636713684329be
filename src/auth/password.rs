use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;

const PASSWORD_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%";

pub fn hash_password(password: &str) -> String {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Random initial credential mailed to the account owner on creation. Only
/// the argon2 hash is stored.
pub fn generate_password(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| PASSWORD_CHARS[rng.random_range(0..PASSWORD_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_passwords_verify_against_their_hash() {
        let password = generate_password(8);
        assert_eq!(password.len(), 8);
        assert!(password.bytes().all(|b| PASSWORD_CHARS.contains(&b)));

        let hash = hash_password(&password);
        assert!(verify_password(&password, &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
