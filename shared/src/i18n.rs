//! Site languages and typed translation tables.
//!
//! Every translatable string is a [`TranslationKey`] variant and each language
//! resolves it through an exhaustive `match`, so adding a key without
//! translating it for every language does not compile.
//!
//! [`alternate_language_links`] is library surface for the site's language
//! switcher.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Languages the site is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
    Ca,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Es, Language::En, Language::Ca];

    pub fn code(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
            Language::Ca => "ca",
        }
    }

    /// Name of the language in that language.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::Es => "Español",
            Language::En => "English",
            Language::Ca => "Català",
        }
    }

    /// URL prefix; the default language has none.
    pub fn path_prefix(self) -> &'static str {
        match self {
            Language::Es => "",
            Language::En => "/en",
            Language::Ca => "/ca",
        }
    }

    /// Resolve a request locale, falling back to the default language.
    pub fn from_locale(locale: Option<&str>) -> Self {
        locale
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "es" => Ok(Language::Es),
            "en" => Ok(Language::En),
            "ca" => Ok(Language::Ca),
            other => Err(Error::Validation(format!("Unsupported language: {}", other))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Strings rendered by the backend (product names and their parts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationKey {
    CouplesOneSmall,
    CouplesOneBig,
    CouplesIndividual,
    FamilySession,
    FriendsSession,
    IndividualSession,
    Adults,
    Kids,
    Canvases,
}

/// Look up a translation.
pub fn translate(language: Language, key: TranslationKey) -> &'static str {
    match language {
        Language::Es => translate_es(key),
        Language::En => translate_en(key),
        Language::Ca => translate_ca(key),
    }
}

fn translate_es(key: TranslationKey) -> &'static str {
    use TranslationKey::*;
    match key {
        CouplesOneSmall => "Un lienzo compartido 30x40",
        CouplesOneBig => "Un lienzo compartido 60x80",
        CouplesIndividual => "Dos lienzos individuales 30x40",
        FamilySession => "Sesión en familia",
        FriendsSession => "Sesión con amigos",
        IndividualSession => "Sesión individual",
        Adults => "adultos",
        Kids => "niños",
        Canvases => "lienzos",
    }
}

fn translate_en(key: TranslationKey) -> &'static str {
    use TranslationKey::*;
    match key {
        CouplesOneSmall => "One shared 30x40 canvas",
        CouplesOneBig => "One shared 60x80 canvas",
        CouplesIndividual => "Two individual 30x40 canvases",
        FamilySession => "Family session",
        FriendsSession => "Friends session",
        IndividualSession => "Individual session",
        Adults => "adults",
        Kids => "kids",
        Canvases => "canvases",
    }
}

fn translate_ca(key: TranslationKey) -> &'static str {
    use TranslationKey::*;
    match key {
        CouplesOneSmall => "Un llenç compartit 30x40",
        CouplesOneBig => "Un llenç compartit 60x80",
        CouplesIndividual => "Dos llenços individuals 30x40",
        FamilySession => "Sessió en família",
        FriendsSession => "Sessió amb amics",
        IndividualSession => "Sessió individual",
        Adults => "adults",
        Kids => "nens",
        Canvases => "llenços",
    }
}

/// Month names, January first.
pub fn month_names(language: Language) -> &'static [&'static str; 12] {
    match language {
        Language::Es => &[
            "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto",
            "septiembre", "octubre", "noviembre", "diciembre",
        ],
        Language::En => &[
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ],
        Language::Ca => &[
            "gener", "febrer", "març", "abril", "maig", "juny", "juliol", "agost", "setembre",
            "octubre", "novembre", "desembre",
        ],
    }
}

/// Abbreviated month names, January first.
pub fn short_month_names(language: Language) -> &'static [&'static str; 12] {
    match language {
        Language::Es => &[
            "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
        ],
        Language::En => &[
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ],
        Language::Ca => &[
            "gen", "febr", "març", "abr", "maig", "juny", "jul", "ag", "set", "oct", "nov", "des",
        ],
    }
}

/// Weekday names, Monday first.
pub fn weekday_names(language: Language) -> &'static [&'static str; 7] {
    match language {
        Language::Es => &[
            "lunes", "martes", "miércoles", "jueves", "viernes", "sábado", "domingo",
        ],
        Language::En => &[
            "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
        ],
        Language::Ca => &[
            "dilluns", "dimarts", "dimecres", "dijous", "divendres", "dissabte", "diumenge",
        ],
    }
}

/// Abbreviated weekday names, Monday first.
pub fn short_weekday_names(language: Language) -> &'static [&'static str; 7] {
    match language {
        Language::Es => &["lun", "mar", "mié", "jue", "vie", "sáb", "dom"],
        Language::En => &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        Language::Ca => &["dl", "dt", "dc", "dj", "dv", "ds", "dg"],
    }
}

fn strip_prefix_segment<'a>(pathname: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = pathname.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Path with any language prefix removed.
pub fn path_without_language(pathname: &str) -> &str {
    for language in Language::ALL {
        let prefix = language.path_prefix();
        if prefix.is_empty() {
            continue;
        }
        if let Some(rest) = strip_prefix_segment(pathname, prefix) {
            return if rest.is_empty() { "/" } else { rest };
        }
    }
    pathname
}

/// The given path as published for `language`.
pub fn localized_path(path: &str, language: Language) -> String {
    let prefix = language.path_prefix();
    let clean = path_without_language(path);

    if clean == "/" {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else {
        format!("{}{}", prefix, clean)
    }
}

/// Link to the current page in another language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageLink {
    pub language: Language,
    pub name: &'static str,
    pub url: String,
    pub current: bool,
}

/// Links to the current page in every language.
pub fn alternate_language_links(current_path: &str, current: Language) -> Vec<LanguageLink> {
    let base_path = path_without_language(current_path);

    Language::ALL
        .into_iter()
        .map(|language| LanguageLink {
            language,
            name: language.native_name(),
            url: localized_path(base_path, language),
            current: language == current,
        })
        .collect()
}
