use uuid::Uuid;

const TAB_ID_LEN: usize = 12;

/// Opaque tab identifier, e.g. `Tab-3f2a9c0d41be`.
pub fn mk_tab_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("Tab-{}", &raw[..TAB_ID_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = mk_tab_id();
        let b = mk_tab_id();
        assert!(a.starts_with("Tab-"));
        assert_eq!(a.len(), 4 + TAB_ID_LEN);
        assert_ne!(a, b);
    }
}
