/// Source kind names used in the `[[sources]]` config tables
pub const HTML_LISTING_KIND: &str = "html_listing";
pub const TEXT_BLOCK_KIND: &str = "text_block";

/// Category assigned when no known canonical form matches
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Duration assumed for a timed event with no end time
pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 90;

/// Duration of an event that only carries a date
pub const ALL_DAY_DURATION_MINUTES: i64 = 24 * 60;

/// Time strings that mean "not announced yet" and are treated as absent
pub const TIME_PLACEHOLDERS: &[&str] = &["tba", "tbc", "tbd", "a definir", "a confirmar", "por confirmar"];

/// Built-in category aliases: canonical name followed by the folded spellings seen in listings
pub const DEFAULT_CATEGORY_ALIASES: &[(&str, &[&str])] = &[
    ("Formula 1", &["f1", "formula 1", "formula one", "formula1", "formule 1", "formel 1", "fia formula 1"]),
    ("Formula 2", &["f2", "formula 2", "fia formula 2"]),
    ("Formula 3", &["f3", "formula 3", "fia formula 3"]),
    ("F1 Academy", &["f1 academy"]),
    ("Formula E", &["formula e", "fia formula e", "e prix"]),
    ("MotoGP", &["motogp", "moto gp"]),
    ("Moto2", &["moto2", "moto 2"]),
    ("Moto3", &["moto3", "moto 3"]),
    ("WorldSBK", &["worldsbk", "wsbk", "superbike", "world superbike"]),
    ("WEC", &["wec", "fia wec", "world endurance championship"]),
    ("IMSA", &["imsa", "imsa weathertech"]),
    ("IndyCar", &["indycar", "indy car", "indycar series"]),
    ("NASCAR Cup", &["nascar", "nascar cup", "nascar cup series"]),
    ("Stock Car", &["stock car", "stock car pro series", "stock car brasil"]),
    ("WRC", &["wrc", "world rally championship"]),
    ("DTM", &["dtm"]),
    ("Porsche Cup", &["porsche cup", "porsche carrera cup"]),
    ("Super Formula", &["super formula"]),
];

/// Folded country spellings mapped to the canonical English name
pub const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("brasil", "Brazil"),
    ("brazil", "Brazil"),
    ("argentina", "Argentina"),
    ("mexico", "Mexico"),
    ("eua", "United States"),
    ("usa", "United States"),
    ("estados unidos", "United States"),
    ("united states", "United States"),
    ("canada", "Canada"),
    ("italia", "Italy"),
    ("italy", "Italy"),
    ("espanha", "Spain"),
    ("espana", "Spain"),
    ("spain", "Spain"),
    ("portugal", "Portugal"),
    ("franca", "France"),
    ("france", "France"),
    ("belgica", "Belgium"),
    ("belgium", "Belgium"),
    ("holanda", "Netherlands"),
    ("paises baixos", "Netherlands"),
    ("netherlands", "Netherlands"),
    ("alemanha", "Germany"),
    ("germany", "Germany"),
    ("austria", "Austria"),
    ("hungria", "Hungary"),
    ("hungary", "Hungary"),
    ("reino unido", "United Kingdom"),
    ("inglaterra", "United Kingdom"),
    ("united kingdom", "United Kingdom"),
    ("uk", "United Kingdom"),
    ("monaco", "Monaco"),
    ("japao", "Japan"),
    ("japan", "Japan"),
    ("china", "China"),
    ("singapura", "Singapore"),
    ("singapore", "Singapore"),
    ("australia", "Australia"),
    ("catar", "Qatar"),
    ("qatar", "Qatar"),
    ("bahrein", "Bahrain"),
    ("bahrain", "Bahrain"),
    ("arabia saudita", "Saudi Arabia"),
    ("saudi arabia", "Saudi Arabia"),
    ("emirados arabes unidos", "United Arab Emirates"),
    ("azerbaijao", "Azerbaijan"),
    ("azerbaijan", "Azerbaijan"),
    ("tailandia", "Thailand"),
    ("thailand", "Thailand"),
    ("indonesia", "Indonesia"),
    ("malasia", "Malaysia"),
    ("malaysia", "Malaysia"),
];

/// Folded circuit and host-city names mapped to their country
pub const CIRCUIT_COUNTRIES: &[(&str, &str)] = &[
    ("interlagos", "Brazil"),
    ("goiania", "Brazil"),
    ("velocitta", "Brazil"),
    ("termas de rio hondo", "Argentina"),
    ("hermanos rodriguez", "Mexico"),
    ("montreal", "Canada"),
    ("gilles villeneuve", "Canada"),
    ("indianapolis", "United States"),
    ("daytona", "United States"),
    ("sebring", "United States"),
    ("circuit of the americas", "United States"),
    ("austin", "United States"),
    ("miami", "United States"),
    ("las vegas", "United States"),
    ("laguna seca", "United States"),
    ("monza", "Italy"),
    ("imola", "Italy"),
    ("mugello", "Italy"),
    ("misano", "Italy"),
    ("barcelona", "Spain"),
    ("catalunya", "Spain"),
    ("jerez", "Spain"),
    ("aragon", "Spain"),
    ("valencia", "Spain"),
    ("madrid", "Spain"),
    ("portimao", "Portugal"),
    ("le mans", "France"),
    ("paul ricard", "France"),
    ("spa francorchamps", "Belgium"),
    ("zandvoort", "Netherlands"),
    ("assen", "Netherlands"),
    ("nurburgring", "Germany"),
    ("hockenheim", "Germany"),
    ("sachsenring", "Germany"),
    ("red bull ring", "Austria"),
    ("spielberg", "Austria"),
    ("hungaroring", "Hungary"),
    ("silverstone", "United Kingdom"),
    ("brands hatch", "United Kingdom"),
    ("monte carlo", "Monaco"),
    ("suzuka", "Japan"),
    ("motegi", "Japan"),
    ("fuji", "Japan"),
    ("shanghai", "China"),
    ("marina bay", "Singapore"),
    ("melbourne", "Australia"),
    ("albert park", "Australia"),
    ("phillip island", "Australia"),
    ("lusail", "Qatar"),
    ("losail", "Qatar"),
    ("sakhir", "Bahrain"),
    ("jeddah", "Saudi Arabia"),
    ("yas marina", "United Arab Emirates"),
    ("abu dhabi", "United Arab Emirates"),
    ("baku", "Azerbaijan"),
    ("buriram", "Thailand"),
    ("mandalika", "Indonesia"),
    ("sepang", "Malaysia"),
];
