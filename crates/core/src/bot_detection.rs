//! User-agent based crawler detection for public landing pages.

use std::sync::LazyLock;

use regex::RegexSet;

/// Signatures of crawlers, link-preview scrapers, and scripted clients.
const BOT_PATTERNS: &[&str] = &[
    r"(?i)bot\b",
    r"(?i)googlebot|adsbot-google|mediapartners-google",
    r"(?i)bingbot|bingpreview|msnbot",
    r"(?i)yeti|naverbot",
    r"(?i)daum(oa)?",
    r"(?i)kakaotalk-scrap",
    r"(?i)facebookexternalhit|facebot",
    r"(?i)twitterbot|slackbot|discordbot|telegrambot|whatsapp",
    r"(?i)crawler|spider|scraper",
    r"(?i)headlesschrome|phantomjs|puppeteer|playwright|selenium",
    r"(?i)^curl/|^wget/|python-requests|python-urllib|go-http-client|java/|okhttp|axios|node-fetch",
    r"(?i)lighthouse|pingdom|uptimerobot",
];

static BOT_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(BOT_PATTERNS).expect("valid bot patterns"));

/// Whether a request's user agent looks automated. A missing or blank user
/// agent counts as a bot.
pub fn is_bot(user_agent: Option<&str>) -> bool {
    match user_agent.map(str::trim) {
        None | Some("") => true,
        Some(ua) => BOT_SET.is_match(ua),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_user_agent_is_bot() {
        assert!(is_bot(None));
        assert!(is_bot(Some("  ")));
    }

    #[test]
    fn known_crawlers_detected() {
        for ua in [
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
            "Mozilla/5.0 (compatible; Yeti/1.1; +http://naver.me/spd)",
            "facebookexternalhit/1.1",
            "kakaotalk-scrap/1.0; +https://devtalk.kakao.com/",
            "curl/8.4.0",
            "python-requests/2.31.0",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 HeadlessChrome/120.0 Safari/537.36",
        ] {
            assert!(is_bot(Some(ua)), "expected bot: {ua}");
        }
    }

    #[test]
    fn browsers_pass() {
        for ua in [
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Linux; Android 14; SM-S918N) AppleWebKit/537.36 (KHTML, like Gecko) SamsungBrowser/23.0 Chrome/115.0.0.0 Mobile Safari/537.36",
        ] {
            assert!(!is_bot(Some(ua)), "expected browser: {ua}");
        }
    }
}
