//! Trust-boundary properties of the registry.

use experiments::registry::{AllowList, ApiFragment, Registry, RegistryError, TokenPolicy};

fn registry() -> Registry {
    Registry::new(["core-a", "core-b", "core-c"].into_iter().collect::<AllowList>())
}

#[test]
fn mint_outside_allow_list_fails_without_side_effects() {
    let registry = registry();
    for outsider in ["third-party", "", "core-a ", "Core-A", "core-d", "@wordpress/data"] {
        let result = registry.mint(outsider);
        assert!(
            matches!(result, Err(RegistryError::NotAllowlisted { ref module }) if module == outsider),
            "{outsider:?} should be refused"
        );
        assert!(!registry.is_registered(outsider));
    }
    assert!(registry.registered_modules().is_empty());
}

#[test]
fn second_mint_fails_and_original_token_stays_valid() {
    let registry = registry();
    for module in ["core-a", "core-b", "core-c"] {
        let token = registry.mint(module).expect("first mint succeeds");
        assert_eq!(
            registry.mint(module).expect_err("second mint fails"),
            RegistryError::AlreadyRegistered {
                module: module.to_owned()
            }
        );
        registry
            .publish(&token, ApiFragment::new().with("alive", true))
            .expect("original token still publishes");
        let api = registry.read(&token, module).expect("original token still reads");
        assert_eq!(api.get::<bool>("alive"), Some(&true));
    }
}

#[test]
fn tokens_never_write_into_another_module() {
    let registry = registry();
    let a = registry.mint("core-a").expect("mint a");
    let b = registry.mint("core-b").expect("mint b");

    registry
        .publish(&a, ApiFragment::new().with("owner", "core-a"))
        .expect("publish with a");

    let b_api = registry.read(&b, "core-b").expect("read b");
    assert!(!b_api.contains("owner"));
    assert!(b_api.is_empty());

    assert_eq!(
        registry.read(&a, "core-b").expect_err("a cannot read b"),
        RegistryError::InvalidToken {
            target: Some("core-b".to_owned())
        }
    );
}

#[test]
fn token_from_another_registry_is_invalid() {
    let first = registry();
    let second = registry();
    let foreign = first.mint("core-a").expect("mint in first");
    let _local = second.mint("core-a").expect("mint in second");

    assert_eq!(
        second
            .publish(&foreign, ApiFragment::new().with("x", 1_u8))
            .expect_err("foreign token"),
        RegistryError::InvalidToken { target: None }
    );
    assert!(second.read(&foreign, "core-a").is_err());
}

#[test]
fn publishes_merge_with_last_write_winning() {
    let registry = registry();
    let token = registry.mint("core-a").expect("mint");

    registry
        .publish(&token, ApiFragment::new().with("a", 1_i64))
        .expect("publish a");
    registry
        .publish(&token, ApiFragment::new().with("b", 2_i64))
        .expect("publish b");
    let api = registry.read(&token, "core-a").expect("read");
    assert_eq!(api.len(), 2);
    assert_eq!(api.get::<i64>("a"), Some(&1));
    assert_eq!(api.get::<i64>("b"), Some(&2));

    registry
        .publish(&token, ApiFragment::new().with("a", 3_i64))
        .expect("overwrite a");
    let api = registry.read(&token, "core-a").expect("read");
    assert_eq!(api.len(), 2);
    assert_eq!(api.get::<i64>("a"), Some(&3));
    assert_eq!(api.get::<i64>("b"), Some(&2));
}

#[test]
fn overwrite_may_change_value_type() {
    let registry = registry();
    let token = registry.mint("core-a").expect("mint");
    registry
        .publish(&token, ApiFragment::new().with("a", 1_i64))
        .expect("publish");
    registry
        .publish(&token, ApiFragment::new().with("a", "one".to_owned()))
        .expect("overwrite");
    let api = registry.read(&token, "core-a").expect("read");
    assert_eq!(api.get::<String>("a").map(String::as_str), Some("one"));
    assert!(api.get::<i64>("a").is_none());
}

#[test]
fn empty_publish_is_a_no_op() {
    let registry = registry();
    let token = registry.mint("core-a").expect("mint");
    registry
        .publish(&token, ApiFragment::new())
        .expect("empty publish succeeds");
    assert!(registry.read(&token, "core-a").expect("read").is_empty());
}

#[test]
fn read_before_write_fails_without_creating_entry() {
    let registry = registry();
    let token = registry.mint("core-a").expect("mint");
    for target in ["unregistered-module", "core-b"] {
        assert_eq!(
            registry.read(&token, target).expect_err("not registered"),
            RegistryError::UnregisteredModule {
                module: target.to_owned()
            }
        );
        assert!(!registry.is_registered(target));
    }
    registry.mint("core-b").expect("core-b can still register later");
}

#[test]
fn any_issued_policy_is_opt_in_and_wider() {
    let strict = registry();
    assert_eq!(strict.policy(), TokenPolicy::Owner);

    let loose = Registry::with_policy(
        ["core-a", "core-b"].into_iter().collect::<AllowList>(),
        TokenPolicy::AnyIssued,
    );
    let a = loose.mint("core-a").expect("mint a");
    let b = loose.mint("core-b").expect("mint b");
    loose
        .publish(&b, ApiFragment::new().with("fromB", 5_u8))
        .expect("publish");
    let api = loose.read(&a, "core-b").expect("any issued token reads b");
    assert_eq!(api.get::<u8>("fromB"), Some(&5));

    // Publishing still only reaches the token's own entry.
    loose
        .publish(&a, ApiFragment::new().with("fromA", 6_u8))
        .expect("publish");
    assert!(!loose.read(&b, "core-b").expect("read").contains("fromA"));
}
