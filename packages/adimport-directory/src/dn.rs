//! Helpers for working with distinguished names
//!
//! Only the subset of RFC 4514 needed for building and splitting the names
//! used by the importer is supported

/// Split `dn` into its RDN components on unescaped commas
pub fn components(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (index, char) in dn.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match char {
            '\\' => escaped = true,
            ',' => {
                parts.push(dn[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }

    let last = dn[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }

    parts
}

/// Split `dn` into its leading RDN and the parent DN
///
/// Returns [None] when the DN has no parent or a component is empty
pub fn split_rdn(dn: &str) -> Option<(&str, &str)> {
    let parts = components(dn);
    if parts.len() < 2 || parts.iter().any(|part| part.is_empty()) {
        return None;
    }

    let rdn = parts[0];
    let parent_start = dn.find(rdn)? + rdn.len();
    let parent = dn[parent_start..].trim_start().strip_prefix(',')?.trim();

    Some((rdn, parent))
}

/// Get the parent DN of `dn`
pub fn parent(dn: &str) -> Option<&str> {
    split_rdn(dn).map(|(_, parent)| parent)
}

/// Get the lowercase attribute name of an RDN, `ou` for `OU=Acme`
pub fn rdn_attribute(rdn: &str) -> Option<String> {
    let (name, _) = rdn.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    Some(name.to_ascii_lowercase())
}

/// Get the unescaped value of an RDN such as `CN=John\, Doe`
pub fn rdn_value(rdn: &str) -> Option<String> {
    let (_, value) = rdn.split_once('=')?;
    Some(unescape_value(value.trim()))
}

/// Normalized form of `dn` used for comparisons, attribute names and values
/// are compared case insensitively
pub fn normalize(dn: &str) -> String {
    components(dn)
        .into_iter()
        .map(|part| match part.split_once('=') {
            Some((name, value)) => format!(
                "{}={}",
                name.trim().to_ascii_lowercase(),
                value.trim().to_lowercase()
            ),
            None => part.to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Domain root (the trailing `DC=` components) of `dn`
pub fn domain_root(dn: &str) -> Option<String> {
    let mut parts: Vec<&str> = components(dn)
        .into_iter()
        .rev()
        .take_while(|part| is_domain_component(part))
        .collect();

    if parts.is_empty() {
        return None;
    }

    parts.reverse();
    Some(parts.join(","))
}

/// DNS domain built from the `DC=` components of `dn`, `DC=example,DC=org`
/// becomes `example.org`
pub fn dns_domain(dn: &str) -> Option<String> {
    let labels: Vec<String> = components(dn)
        .into_iter()
        .filter(|part| is_domain_component(part))
        .filter_map(rdn_value)
        .collect();

    if labels.is_empty() {
        return None;
    }

    Some(labels.join("."))
}

fn is_domain_component(part: &str) -> bool {
    part.split_once('=')
        .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case("dc"))
}

/// Escape a value for use within an RDN
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (index, char) in value.chars().enumerate() {
        match char {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                escaped.push('\\');
                escaped.push(char);
            }
            '#' if index == 0 => escaped.push_str("\\#"),
            ' ' if index == 0 || index == last => escaped.push_str("\\ "),
            '\0' => escaped.push_str("\\00"),
            char => escaped.push(char),
        }
    }

    escaped
}

/// Reverse of [escape_value], also handles hex pair escapes (`\2C`)
pub fn unescape_value(value: &str) -> String {
    let mut output: Vec<u8> = Vec::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\' && index + 1 < bytes.len() {
            let hex = value
                .get(index + 1..index + 3)
                .filter(|pair| pair.bytes().all(|byte| byte.is_ascii_hexdigit()))
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());

            match hex {
                Some(byte) => {
                    output.push(byte);
                    index += 3;
                }
                None => {
                    output.push(bytes[index + 1]);
                    index += 2;
                }
            }
            continue;
        }

        output.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&output).into_owned()
}

/// Escape a value for use within a search filter
pub fn escape_filter(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for char in value.chars() {
        match char {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            char => escaped.push(char),
        }
    }
    escaped
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_components_respects_escapes() {
        assert_eq!(
            components("CN=Doe\\, John,OU=Users,DC=example,DC=org"),
            vec!["CN=Doe\\, John", "OU=Users", "DC=example", "DC=org"]
        );
        assert!(components("").is_empty());
    }

    #[test]
    fn test_split_rdn() {
        assert_eq!(
            split_rdn("CN=jdoe_acme,CN=Users,DC=example,DC=org"),
            Some(("CN=jdoe_acme", "CN=Users,DC=example,DC=org"))
        );
        assert_eq!(
            split_rdn("OU=Groups, OU=Acme,DC=org"),
            Some(("OU=Groups", "OU=Acme,DC=org"))
        );
        assert_eq!(split_rdn("DC=org"), None);
        assert_eq!(split_rdn("CN=a,,DC=org"), None);
    }

    #[test]
    fn test_rdn_value() {
        assert_eq!(rdn_value("OU=Acme").as_deref(), Some("Acme"));
        assert_eq!(rdn_value("CN=Doe\\, John").as_deref(), Some("Doe, John"));
        assert_eq!(rdn_value("CN=Doe\\2C John").as_deref(), Some("Doe, John"));
        assert_eq!(rdn_value("Acme"), None);
    }

    #[test]
    fn test_rdn_attribute() {
        assert_eq!(rdn_attribute("OU=Acme").as_deref(), Some("ou"));
        assert_eq!(rdn_attribute(" CN = jdoe").as_deref(), Some("cn"));
        assert_eq!(rdn_attribute("=Acme"), None);
        assert_eq!(rdn_attribute("Acme"), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("CN=JDoe, OU=Users ,dc=Example,DC=org"),
            "cn=jdoe,ou=users,dc=example,dc=org"
        );
    }

    #[test]
    fn test_domain_root_and_dns_domain() {
        let dn = "CN=Administrator,CN=Users,DC=example,DC=org";
        assert_eq!(domain_root(dn).as_deref(), Some("DC=example,DC=org"));
        assert_eq!(dns_domain(dn).as_deref(), Some("example.org"));
        assert_eq!(domain_root("CN=Users,O=corp"), None);
        assert_eq!(domain_root("DC=a,OU=b,DC=org").as_deref(), Some("DC=org"));
        assert_eq!(dns_domain("CN=Users,O=corp"), None);
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value("Acme"), "Acme");
        assert_eq!(escape_value("Acme, Inc"), "Acme\\, Inc");
        assert_eq!(escape_value("#1 "), "\\#1\\ ");
        assert_eq!(unescape_value(&escape_value("a=b;c")), "a=b;c");
    }

    #[test]
    fn test_escape_filter() {
        assert_eq!(escape_filter("group*)(x"), "group\\2a\\29\\28x");
    }
}
