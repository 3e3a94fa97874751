mod password;

pub use password::{
    CredentialHasher, MIN_PASSWORD_LENGTH, check_password, generate_password,
};
