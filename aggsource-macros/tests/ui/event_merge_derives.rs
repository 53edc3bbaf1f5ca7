use aggsource_domain::event::Event;
use aggsource_macros::event;

// 已有派生与默认派生合并去重，辅助属性保持有效
#[event]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
struct LimitRaised {
    new_limit: u32,
}

fn main() {
    assert!(is_hashable_event(&LimitRaised { new_limit: 3 }));
    assert_eq!(LimitRaised::EVENT_TYPE, "LimitRaised");
    assert_eq!(LimitRaised::default(), LimitRaised { new_limit: 0 });
}

fn is_hashable_event<T: Event + Eq + std::hash::Hash>(_: &T) -> bool {
    true
}
