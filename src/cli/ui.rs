use console::style;

/// Defines different styles for text elements.
pub enum StyleType {
    Success,
    Value,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Success => style(text).green(),
        StyleType::Value => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Line printed after the client saved a quote.
pub fn saved_message(value: &str, path: &str) -> String {
    format!(
        "{} {} {}",
        style_text("Cotação do dólar salva em", StyleType::Success),
        style_text(path, StyleType::Subtle),
        style_text(&format!("({value})"), StyleType::Value),
    )
}

/// Line printed when the client run failed.
pub fn failure_message(err: &dyn std::fmt::Display) -> String {
    style_text(&format!("Erro ao obter cotação: {err}"), StyleType::Error)
}
