//! Active Directory account helpers

/// `userAccountControl` flag for a normal user account
pub const UF_NORMAL_ACCOUNT: u32 = 0x200;

/// `userAccountControl` flag preventing the password from expiring
pub const UF_DONT_EXPIRE_PASSWD: u32 = 0x10000;

/// Encode a plaintext password for the `unicodePwd` attribute
///
/// Active Directory expects the password surrounded in double quotes
/// and encoded as UTF-16LE
pub fn encode_unicode_pwd(password: &str) -> Vec<u8> {
    format!("\"{password}\"")
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode_unicode_pwd() {
        let encoded = encode_unicode_pwd("Ab1");
        assert_eq!(
            encoded,
            vec![0x22, 0x00, b'A', 0x00, b'b', 0x00, b'1', 0x00, 0x22, 0x00]
        );
    }

    #[test]
    fn test_encode_unicode_pwd_non_ascii() {
        let encoded = encode_unicode_pwd("é");
        assert_eq!(encoded, vec![0x22, 0x00, 0xE9, 0x00, 0x22, 0x00]);
    }

    #[test]
    fn test_enabled_account_flags() {
        assert_eq!(UF_NORMAL_ACCOUNT | UF_DONT_EXPIRE_PASSWD, 66048);
    }
}
