//! Filter chains encoded in file names.
//!
//! A file name can carry a shorthand filter chain between parentheses after a
//! marker:
//!
//! ```text
//! photos/cat-filters(300x200-crop-rotate(90)-grayscale).jpg
//!        └┬┘ └──┬──┘ └─────────────┬──────────────────┘└┬┘
//!       stem  marker             tokens                 extension
//! ```
//!
//! Tokens are joined by the separator (default `-`):
//!
//! | Token | Option |
//! |---|---|
//! | `300x200`, `300x_`, `_x200` | `width` / `height` |
//! | `crop` | `"crop": true` |
//! | `rotate(90)` | `"rotate": 90` |
//! | `colorize(ff0000)` | `"colorize": "ff0000"` |
//! | `name(a,b)` | `"name": [a, b]` |
//!
//! [`parse`] strips the chain and returns the plain path (`photos/cat.jpg`)
//! with the options as a [`FilterChainConfig::Shorthand`]; [`format`] renders
//! the inverse.

use crate::chain::FilterChainConfig;
use crate::config::UrlConfig;
use crate::error::{ImageError, Result};
use serde_json::{Map, Number, Value};

/// Placeholder for an omitted side in a size token.
const ANY_SIDE: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    pub marker: String,
    pub separator: char,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            marker: "filters".to_string(),
            separator: '-',
        }
    }
}

impl From<&UrlConfig> for UrlOptions {
    fn from(config: &UrlConfig) -> Self {
        Self {
            marker: config.marker.clone(),
            separator: config.separator.chars().next().unwrap_or('-'),
        }
    }
}

impl UrlOptions {
    /// `-filters(`
    fn opening(&self) -> String {
        format!("{}{}(", self.separator, self.marker)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUrl {
    /// Path with the filter chain removed.
    pub path: String,
    pub config: FilterChainConfig,
}

fn invalid(url: &str, message: impl std::fmt::Display) -> ImageError {
    ImageError::InvalidConfig(format!("{url}: {message}"))
}

/// Split a filter URL into the plain path and its filter chain.
///
/// A URL without the marker comes back unchanged with an empty chain.
pub fn parse(url: &str, options: &UrlOptions) -> Result<ParsedUrl> {
    let name_start = url.rfind('/').map_or(0, |i| i + 1);
    let (dir, name) = url.split_at(name_start);
    let opening = options.opening();

    let Some(marker_at) = name.find(&opening) else {
        return Ok(ParsedUrl {
            path: url.to_string(),
            config: FilterChainConfig::empty(),
        });
    };

    let stem = &name[..marker_at];
    let inner_start = marker_at + opening.len();
    let inner_len = closing_paren(&name[inner_start..])
        .ok_or_else(|| invalid(url, "unbalanced parentheses"))?;
    let inner = &name[inner_start..inner_start + inner_len];
    let rest = &name[inner_start + inner_len + 1..];

    if stem.is_empty() {
        return Err(invalid(url, "missing file name before the filter chain"));
    }
    if !(rest.is_empty() || rest.starts_with('.')) || rest.contains(['(', ')']) {
        return Err(invalid(url, format!("unexpected '{rest}' after the filter chain")));
    }

    let mut config = Map::new();
    for token in split_top_level(inner, options.separator).map_err(|m| invalid(url, m))? {
        for (key, value) in parse_token(token).map_err(|m| invalid(url, m))? {
            if config.insert(key.clone(), value).is_some() {
                return Err(invalid(url, format!("option '{key}' given twice")));
            }
        }
    }

    Ok(ParsedUrl {
        path: format!("{dir}{stem}{rest}"),
        config: FilterChainConfig::Shorthand(config),
    })
}

/// Byte offset of the `)` closing an already opened parenthesis.
fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split on `separator` outside parentheses.
fn split_top_level(inner: &str, separator: char) -> std::result::Result<Vec<&str>, String> {
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced parentheses".to_string())?
            }
            c if c == separator && depth == 0 => {
                tokens.push(&inner[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced parentheses".into());
    }
    tokens.push(&inner[start..]);
    if tokens.iter().any(|t| t.is_empty()) {
        return Err("empty filter token".into());
    }
    Ok(tokens)
}

/// Filter or preset name: a letter followed by letters, digits or `_`.
fn is_name(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_alphabetic())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_side(side: &str) -> Option<Option<u64>> {
    if side == ANY_SIDE {
        Some(None)
    } else if !side.is_empty() && side.bytes().all(|b| b.is_ascii_digit()) {
        side.parse().ok().map(Some)
    } else {
        None
    }
}

/// `300x200`, `300x_`, `_x200`. `None` when the token is not a size.
fn parse_size(token: &str) -> Option<(Option<u64>, Option<u64>)> {
    let (w, h) = token.split_once('x')?;
    let size = (parse_side(w)?, parse_side(h)?);
    (size != (None, None)).then_some(size)
}

/// Argument text to a JSON value. Digit strings with a leading zero stay
/// strings so hex colors like `000000` survive.
fn parse_arg(arg: &str) -> Value {
    match arg {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let leading_zero = arg.len() > 1 && arg.starts_with('0') && !arg.starts_with("0.");
    if !leading_zero {
        if let Ok(int) = arg.parse::<i64>() {
            return Value::from(int);
        }
        if let Ok(float) = arg.parse::<f64>()
            && let Some(number) = Number::from_f64(float)
        {
            return Value::Number(number);
        }
    }
    Value::String(arg.to_string())
}

fn parse_token(token: &str) -> std::result::Result<Vec<(String, Value)>, String> {
    if let Some((width, height)) = parse_size(token) {
        let mut options = Vec::new();
        if let Some(w) = width {
            options.push(("width".to_string(), Value::from(w)));
        }
        if let Some(h) = height {
            options.push(("height".to_string(), Value::from(h)));
        }
        return Ok(options);
    }

    if let Some(open) = token.find('(') {
        let name = &token[..open];
        let args = token[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| format!("malformed token '{token}'"))?;
        if !is_name(name) || args.contains(['(', ')']) {
            return Err(format!("malformed token '{token}'"));
        }
        let value = match args.split(',').map(parse_arg).collect::<Vec<_>>() {
            _ if args.is_empty() => Value::Bool(true),
            mut single if single.len() == 1 => single.remove(0),
            many => Value::Array(many),
        };
        return Ok(vec![(name.to_string(), value)]);
    }

    if is_name(token) {
        Ok(vec![(token.to_string(), Value::Bool(true))])
    } else {
        Err(format!("malformed token '{token}'"))
    }
}

fn render_arg(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) if !s.is_empty() && !s.contains(['(', ')', ',']) => Some(s.clone()),
        _ => None,
    }
}

fn render_side(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => Some(ANY_SIDE.to_string()),
        Some(Value::Number(n)) if n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Encode a shorthand `config` into `path`. The inverse of [`parse`].
pub fn format(path: &str, config: &FilterChainConfig, options: &UrlOptions) -> Result<String> {
    let FilterChainConfig::Shorthand(map) = config else {
        return Err(ImageError::InvalidConfig(
            "only shorthand filter chains can be encoded in a file name".into(),
        ));
    };
    let cannot = |key: &str, value: &Value| {
        ImageError::InvalidConfig(format!("cannot encode {key}={value} in a file name"))
    };

    let sep = options.separator.to_string();
    let mut tokens: Vec<String> = Vec::new();
    let mut size_emitted = false;
    for (key, value) in map {
        match key.as_str() {
            "width" | "height" => {
                if size_emitted {
                    continue;
                }
                size_emitted = true;
                let width = render_side(map.get("width"));
                let height = render_side(map.get("height"));
                match (width, height) {
                    (Some(w), Some(h)) if !(w == ANY_SIDE && h == ANY_SIDE) => {
                        tokens.push(format!("{w}x{h}"))
                    }
                    (Some(_), Some(_)) => {}
                    _ => return Err(cannot(key, value)),
                }
            }
            _ => match value {
                Value::Bool(false) | Value::Null => {}
                Value::Bool(true) => tokens.push(key.clone()),
                Value::Array(items) => {
                    let args = items
                        .iter()
                        .map(render_arg)
                        .collect::<Option<Vec<_>>>()
                        .filter(|args| !args.is_empty())
                        .ok_or_else(|| cannot(key, value))?;
                    tokens.push(format!("{key}({})", args.join(",")));
                }
                other => {
                    let arg = render_arg(other).ok_or_else(|| cannot(key, value))?;
                    tokens.push(format!("{key}({arg})"));
                }
            },
        }
    }

    if tokens.is_empty() {
        return Ok(path.to_string());
    }

    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let (dir, name) = path.split_at(name_start);
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };
    Ok(format!(
        "{dir}{stem}{}{}){ext}",
        options.opening(),
        tokens.join(sep.as_str())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn options() -> UrlOptions {
        UrlOptions::default()
    }

    fn shorthand(value: Value) -> FilterChainConfig {
        FilterChainConfig::from_value(value).unwrap()
    }

    #[test]
    fn parses_size_crop_and_rotate() {
        let parsed = parse("cat-filters(300x200-crop-rotate(90)).jpg", &options()).unwrap();
        assert_eq!(parsed.path, "cat.jpg");
        assert_eq!(
            parsed.config,
            shorthand(json!({"width": 300, "height": 200, "crop": true, "rotate": 90}))
        );
    }

    #[test]
    fn keeps_directories() {
        let parsed = parse("photos/2024/cat-filters(grayscale).png", &options()).unwrap();
        assert_eq!(parsed.path, "photos/2024/cat.png");
        assert_eq!(parsed.config, shorthand(json!({"grayscale": true})));
    }

    #[test]
    fn one_sided_sizes() {
        let parsed = parse("a-filters(_x120).jpg", &options()).unwrap();
        assert_eq!(parsed.config, shorthand(json!({"height": 120})));
        let parsed = parse("a-filters(64x_).jpg", &options()).unwrap();
        assert_eq!(parsed.config, shorthand(json!({"width": 64})));
    }

    #[test]
    fn argument_types() {
        let parsed = parse(
            "a-filters(blur(2.5)-colorize(000000)-gamma(1)-custom(a,2)).jpg",
            &options(),
        )
        .unwrap();
        assert_eq!(
            parsed.config,
            shorthand(json!({
                "blur": 2.5,
                "colorize": "000000",
                "gamma": 1,
                "custom": ["a", 2]
            }))
        );
    }

    #[test]
    fn negative_angles_are_not_split() {
        let parsed = parse("a-filters(rotate(-90)).jpg", &options()).unwrap();
        assert_eq!(parsed.config, shorthand(json!({"rotate": -90})));
    }

    #[test]
    fn no_marker_is_empty_chain() {
        let parsed = parse("photos/plain-name.jpg", &options()).unwrap();
        assert_eq!(parsed.path, "photos/plain-name.jpg");
        assert!(parsed.config.is_empty());
    }

    #[test]
    fn custom_marker_and_separator() {
        let options = UrlOptions {
            marker: "fx".into(),
            separator: '~',
        };
        let parsed = parse("hero~fx(800x_~negative).webp", &options).unwrap();
        assert_eq!(parsed.path, "hero.webp");
        assert_eq!(parsed.config, shorthand(json!({"width": 800, "negative": true})));
    }

    #[test]
    fn malformed_urls_are_invalid_config() {
        for url in [
            "a-filters(300x200.jpg",
            "a-filters(rotate(90).jpg",
            "a-filters(300x200--crop).jpg",
            "a-filters(300x).jpg",
            "a-filters(_x_).jpg",
            "a-filters(ro tate).jpg",
            "a-filters(crop)extra.jpg",
            "-filters(crop).jpg",
            "a-filters(crop-crop).jpg",
        ] {
            let err = parse(url, &options()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig, "{url}");
        }
    }

    #[test]
    fn format_is_inverse_of_parse() {
        let config = shorthand(json!({"width": 300, "height": 200, "crop": true, "rotate": 90}));
        let name = format("cat.jpg", &config, &options()).unwrap();
        assert_eq!(name, "cat-filters(300x200-crop-rotate(90)).jpg");

        let parsed = parse(&name, &options()).unwrap();
        assert_eq!(parsed.path, "cat.jpg");
        assert_eq!(parsed.config, config);
    }

    #[test]
    fn format_one_side_and_arrays() {
        let config = shorthand(json!({"height": 50, "custom": [1, "b"], "negative": false}));
        assert_eq!(
            format("dir/x.png", &config, &options()).unwrap(),
            "dir/x-filters(_x50-custom(1,b)).png"
        );
    }

    #[test]
    fn format_without_options_keeps_path() {
        assert_eq!(
            format("cat.jpg", &FilterChainConfig::empty(), &options()).unwrap(),
            "cat.jpg"
        );
    }

    #[test]
    fn format_rejects_unencodable_values() {
        let explicit = FilterChainConfig::Explicit(vec![]);
        assert!(format("a.jpg", &explicit, &options()).is_err());

        let object = shorthand(json!({"crop": {"width": 10, "height": 10}}));
        assert_eq!(
            format("a.jpg", &object, &options()).unwrap_err().kind(),
            ErrorKind::InvalidConfig
        );
        let fractional = shorthand(json!({"width": 10.5}));
        assert!(format("a.jpg", &fractional, &options()).is_err());
    }
}
