use indexmap::IndexMap;

/// Rewrite a route template into OpenAPI form: `:id` segments become
/// `{id}` and an optional format suffix such as `(.:format)` is dropped.
pub fn normalize_template(template: &str) -> String {
    let without_format = strip_format_suffix(template);
    let segments: Vec<String> = without_format
        .split('/')
        .map(|seg| match seg.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => seg.to_string(),
        })
        .collect();
    let joined = segments.join("/");
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

fn strip_format_suffix(template: &str) -> &str {
    match template.rfind("(.") {
        Some(index) if template.ends_with(')') => &template[..index],
        _ => template,
    }
}

/// Names of the variables in a template, from `:name` and `{name}` segments.
pub fn path_variables(template: &str) -> Vec<String> {
    strip_format_suffix(template)
        .split('/')
        .filter_map(|seg| {
            if let Some(name) = seg.strip_prefix(':') {
                return Some(name);
            }
            seg.strip_prefix('{').and_then(|rest| rest.strip_suffix('}'))
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rename `{old}` placeholders of a normalized template through `aliases`.
pub fn alias_template(template: &str, aliases: &IndexMap<String, String>) -> String {
    if aliases.is_empty() {
        return template.to_string();
    }
    template
        .split('/')
        .map(|seg| {
            seg.strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
                .and_then(|name| aliases.get(name))
                .map(|alias| format!("{{{alias}}}"))
                .unwrap_or_else(|| seg.to_string())
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// One bracket segment of a nested parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSegment {
    pub name: String,
    /// Followed by `[]`: the value is an array of what comes next.
    pub is_array: bool,
}

pub fn is_nested(name: &str) -> bool {
    name.contains('[') && name.ends_with(']')
}

/// Split `user[address][zip]` into its segments. `items[][name]` marks
/// `items` as an array whose elements carry `name`.
pub fn split_nested(name: &str) -> Vec<NameSegment> {
    let root_end = name.find('[').unwrap_or(name.len());
    let mut segments = vec![NameSegment {
        name: name[..root_end].to_string(),
        is_array: false,
    }];

    let mut rest = &name[root_end..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        let key = &inner[..close];
        if key.is_empty() {
            if let Some(last) = segments.last_mut() {
                last.is_array = true;
            }
        } else {
            segments.push(NameSegment {
                name: key.to_string(),
                is_array: false,
            });
        }
        rest = &inner[close + 1..];
    }
    segments
}
