use tracing::warn;

const SUPPORTED_LOCALES: &[&str] = &["en", "ko"];

/// Select the locale for user-visible strings, falling back to English
pub fn set_locale(locale: &str) {
    let language = locale.split(['-', '_']).next().unwrap_or_default().to_lowercase();
    if SUPPORTED_LOCALES.contains(&language.as_str()) {
        rust_i18n::set_locale(&language);
    } else {
        warn!("Unsupported locale '{}', using en", locale);
        rust_i18n::set_locale("en");
    }
}
