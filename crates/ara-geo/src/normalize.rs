use std::sync::LazyLock;

use regex::Regex;

/// Known aliases mapped to the name the geocoder recognises. Applied only
/// when the target name is not already present, so the pass is idempotent.
const PLACE_ALIASES: &[(&str, &str)] = &[
    ("효자파출소", "청운파출소"),
    ("효자치안센터", "청운파출소"),
    ("남대문서", "남대문경찰서"),
    ("파이낸스", "서울파이낸스센터"),
    ("의사당역", "국회의사당역"),
    ("사랑채", "청와대 사랑채"),
    ("전쟁기념관", "용산 전쟁기념관"),
];

static DISTANCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?\s*km").expect("distance regex"));
static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<\[(].*?[>\])]").expect("bracket regex"));
static UNCLOSED_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*$").expect("paren regex"));
static ROUTE_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[⇄↔→~]").expect("separator regex"));
static NUMBERED_EXIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*出").expect("exit regex"));
static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "(동측|서측|남측|북측|동쪽|서쪽|남쪽|북쪽|건너편|맞은편|옆|방향|방면|부근|일대|진입로|\
         사거리|교차로|삼거리|오거리|출구|입구|인근|앞|뒤|안|밖)",
    )
    .expect("filler regex")
});
static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Strips directional, distance and landmark noise from a free-text place so
/// it can be sent to a keyword geocoder. Returns an empty string when fewer
/// than two characters survive.
///
/// `normalize_place(normalize_place(x)) == normalize_place(x)` for all inputs.
pub fn normalize_place(raw: &str) -> String {
    let mut text = raw.trim().replace("(구)", "").replace("구)", "");
    text = DISTANCE_RE.replace_all(&text, "").into_owned();
    text = BRACKETED_RE.replace_all(&text, "").into_owned();
    text = UNCLOSED_PAREN_RE.replace(&text, "").into_owned();

    for (alias, canonical) in PLACE_ALIASES {
        if text.contains(alias) && !text.contains(canonical) {
            text = text.replace(alias, canonical);
        }
    }

    if let Some(first) = ROUTE_SEPARATOR_RE.split(&text).next() {
        text = first.to_string();
    }

    text = NUMBERED_EXIT_RE.replace_all(&text, "${1}번출구").into_owned();
    text = text.replace('出', "출구");
    text = FILLER_RE.replace_all(&text, " ").into_owned();
    text = PUNCTUATION_RE.replace_all(&text, " ").into_owned();
    // `3-km` only reads as a distance once the dash is gone.
    text = DISTANCE_RE.replace_all(&text, "").into_owned();
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ").into_owned();

    if collapsed.chars().count() < 2 {
        String::new()
    } else {
        collapsed
    }
}
