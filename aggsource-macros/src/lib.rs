use proc_macro::TokenStream;

mod event;
mod utils;

/// 事件宏
/// - 仅用于结构体（具名、tuple 或 unit）
/// - 合并/追加派生：Debug, Clone, PartialEq, Serialize, Deserialize
/// - 实现 `::aggsource_domain::event::Event`，`EVENT_TYPE` 默认为结构体名
/// - 支持参数：`#[event(event_type = "...")]` 覆写类型标签
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    event::expand(attr, item)
}
