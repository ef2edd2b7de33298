/// 生成限流计数键，命名空间为空时直接使用标识本身
pub fn rate_limit_key(namespace: &str, identifier: &str) -> String {
    if namespace.is_empty() {
        identifier.to_string()
    } else {
        format!("{}:{}", namespace, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_prefixes_identifier() {
        assert_eq!(rate_limit_key("test", "u1"), "test:u1");
        assert_eq!(rate_limit_key("", "u1"), "u1");
    }
}
