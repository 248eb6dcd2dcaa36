use analysis_core::{require_len, Bar};
use log::debug;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::PatternThresholds;
use crate::indicators::regression_slope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandlestickPattern {
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    BullishEngulfing,
    BearishEngulfing,
    PiercingLine,
    DarkCloudCover,
    BullishHarami,
    BearishHarami,
    TweezerBottom,
    TweezerTop,
    DragonflyDoji,
    GravestoneDoji,
    Hammer,
    HangingMan,
    InvertedHammer,
    ShootingStar,
    BullishMarubozu,
    BearishMarubozu,
    Doji,
    SpinningTop,
    /// No rule matched, or the window was too short
    #[serde(rename = "NONE")]
    NoPattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternPolarity {
    Bullish,
    Bearish,
    Neutral,
}

impl CandlestickPattern {
    pub fn polarity(&self) -> PatternPolarity {
        use CandlestickPattern::*;
        match self {
            MorningStar | ThreeWhiteSoldiers | BullishEngulfing | PiercingLine | BullishHarami
            | TweezerBottom | DragonflyDoji | Hammer | InvertedHammer | BullishMarubozu => {
                PatternPolarity::Bullish
            }
            EveningStar | ThreeBlackCrows | BearishEngulfing | DarkCloudCover | BearishHarami
            | TweezerTop | GravestoneDoji | HangingMan | ShootingStar | BearishMarubozu => {
                PatternPolarity::Bearish
            }
            Doji | SpinningTop | NoPattern => PatternPolarity::Neutral,
        }
    }

    /// Bars the rule inspects, counting back from the most recent
    pub fn min_bars(&self) -> usize {
        use CandlestickPattern::*;
        match self {
            MorningStar | EveningStar | ThreeWhiteSoldiers | ThreeBlackCrows => 3,
            BullishEngulfing | BearishEngulfing | PiercingLine | DarkCloudCover | BullishHarami
            | BearishHarami | TweezerBottom | TweezerTop => 2,
            _ => 1,
        }
    }
}

/// Classification of the most recent bars.
///
/// `bullish`/`bearish` are views of `current`'s polarity and are only ever
/// computed, never stored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternResult {
    pub current: CandlestickPattern,
    pub confidence: f64,
    /// Every rule that matched, in evaluation order
    pub patterns: Vec<CandlestickPattern>,
}

impl PatternResult {
    pub fn none() -> Self {
        Self {
            current: CandlestickPattern::NoPattern,
            confidence: 0.0,
            patterns: Vec::new(),
        }
    }

    pub fn polarity(&self) -> PatternPolarity {
        self.current.polarity()
    }

    pub fn bullish(&self) -> bool {
        self.polarity() == PatternPolarity::Bullish
    }

    pub fn bearish(&self) -> bool {
        self.polarity() == PatternPolarity::Bearish
    }

    /// Confidence in range, `current` consistent with `patterns`
    pub fn is_well_formed(&self) -> bool {
        if !(0.0..=1.0).contains(&self.confidence) {
            return false;
        }
        match self.current {
            CandlestickPattern::NoPattern => self.confidence == 0.0 && self.patterns.is_empty(),
            current => {
                self.patterns.first() == Some(&current)
                    && !self.patterns.contains(&CandlestickPattern::NoPattern)
            }
        }
    }
}

impl Default for PatternResult {
    fn default() -> Self {
        Self::none()
    }
}

impl Serialize for PatternResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PatternResult", 5)?;
        state.serialize_field("current", &self.current)?;
        state.serialize_field("confidence", &self.confidence)?;
        state.serialize_field("bullish", &self.bullish())?;
        state.serialize_field("bearish", &self.bearish())?;
        state.serialize_field("patterns", &self.patterns)?;
        state.end()
    }
}

/// Detect trend direction using highs and lows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

/// Regression-slope trend over the last `lookback` bars (or all of them when
/// fewer exist). Fewer than two bars read as sideways.
pub fn detect_trend(bars: &[Bar], lookback: usize) -> Trend {
    let recent = &bars[bars.len().saturating_sub(lookback)..];
    if recent.len() < 2 {
        return Trend::Sideways;
    }

    let highs: Vec<f64> = recent.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = recent.iter().map(|b| b.low).collect();

    let avg_slope = (regression_slope(&highs) + regression_slope(&lows)) / 2.0;
    let price_range = recent.iter().map(|b| b.range()).sum::<f64>() / recent.len() as f64;

    // If slope is significant relative to price range, determine trend
    if avg_slope > price_range * 0.1 {
        Trend::Uptrend
    } else if avg_slope < -price_range * 0.1 {
        Trend::Downtrend
    } else {
        Trend::Sideways
    }
}

/// The window under test plus the trend that preceded its last bar
struct PatternContext<'a> {
    bars: &'a [Bar],
    prior_trend: Trend,
}

impl<'a> PatternContext<'a> {
    fn new(bars: &'a [Bar], lookback: usize) -> Self {
        let prior_trend = detect_trend(&bars[..bars.len().saturating_sub(1)], lookback);
        Self { bars, prior_trend }
    }

    /// `back` = 0 is the most recent bar
    fn bar(&self, back: usize) -> &Bar {
        &self.bars[self.bars.len() - 1 - back]
    }
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

/// How far `value` clears `threshold`, normalised by `span`, in [0, 1]
fn excess(value: f64, threshold: f64, span: f64) -> f64 {
    if span <= 0.0 {
        return 1.0;
    }
    ((value - threshold) / span).clamp(0.0, 1.0)
}

fn morning_star(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let (first, star, third) = (ctx.bar(2), ctx.bar(1), ctx.bar(0));
    let first_mid = first.midpoint();
    if first.is_bearish()
        && third.is_bullish()
        && first.range() > 0.0
        && star.body() < first.body() * t.star_body_ratio
        && third.close > first_mid
    {
        return Some(excess(third.close, first_mid, first.open - first_mid));
    }
    None
}

fn evening_star(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let (first, star, third) = (ctx.bar(2), ctx.bar(1), ctx.bar(0));
    let first_mid = first.midpoint();
    if first.is_bullish()
        && third.is_bearish()
        && first.range() > 0.0
        && star.body() < first.body() * t.star_body_ratio
        && third.close < first_mid
    {
        return Some(excess(first_mid, third.close, first_mid - first.open));
    }
    None
}

fn average_body_ratio(bars: [&Bar; 3]) -> f64 {
    bars.iter().map(|b| ratio(b.body(), b.range())).sum::<f64>() / 3.0
}

fn three_white_soldiers(ctx: &PatternContext, _t: &PatternThresholds) -> Option<f64> {
    let (a, b, c) = (ctx.bar(2), ctx.bar(1), ctx.bar(0));
    // Each candle closes higher and opens within the body of the previous
    if [a, b, c].iter().all(|bar| bar.is_bullish())
        && b.close > a.close
        && c.close > b.close
        && b.open > a.open
        && b.open < a.close
        && c.open > b.open
        && c.open < b.close
    {
        return Some(average_body_ratio([a, b, c]));
    }
    None
}

fn three_black_crows(ctx: &PatternContext, _t: &PatternThresholds) -> Option<f64> {
    let (a, b, c) = (ctx.bar(2), ctx.bar(1), ctx.bar(0));
    if [a, b, c].iter().all(|bar| bar.is_bearish())
        && b.close < a.close
        && c.close < b.close
        && b.open < a.open
        && b.open > a.close
        && c.open < b.open
        && c.open > b.close
    {
        return Some(average_body_ratio([a, b, c]));
    }
    None
}

fn bullish_engulfing(ctx: &PatternContext, _t: &PatternThresholds) -> Option<f64> {
    let (prev, curr) = (ctx.bar(1), ctx.bar(0));
    if prev.is_bearish()
        && curr.is_bullish()
        && curr.open <= prev.close
        && curr.close >= prev.open
        && curr.body() > prev.body()
    {
        return Some(excess(ratio(curr.body(), prev.body()), 1.0, 1.0));
    }
    None
}

fn bearish_engulfing(ctx: &PatternContext, _t: &PatternThresholds) -> Option<f64> {
    let (prev, curr) = (ctx.bar(1), ctx.bar(0));
    if prev.is_bullish()
        && curr.is_bearish()
        && curr.open >= prev.close
        && curr.close <= prev.open
        && curr.body() > prev.body()
    {
        return Some(excess(ratio(curr.body(), prev.body()), 1.0, 1.0));
    }
    None
}

fn piercing_line(ctx: &PatternContext, _t: &PatternThresholds) -> Option<f64> {
    let (prev, curr) = (ctx.bar(1), ctx.bar(0));
    let prev_mid = prev.midpoint();
    // Opens below the prior low, closes above the midpoint of the prior body
    if prev.is_bearish()
        && curr.is_bullish()
        && curr.open < prev.low
        && curr.close > prev_mid
        && curr.close < prev.open
    {
        return Some(excess(curr.close, prev_mid, prev.open - prev_mid));
    }
    None
}

fn dark_cloud_cover(ctx: &PatternContext, _t: &PatternThresholds) -> Option<f64> {
    let (prev, curr) = (ctx.bar(1), ctx.bar(0));
    let prev_mid = prev.midpoint();
    if prev.is_bullish()
        && curr.is_bearish()
        && curr.open > prev.high
        && curr.close < prev_mid
        && curr.close > prev.open
    {
        return Some(excess(prev_mid, curr.close, prev_mid - prev.open));
    }
    None
}

fn body_inside(inner: &Bar, outer: &Bar) -> bool {
    inner.body_top() < outer.body_top() && inner.body_bottom() > outer.body_bottom()
}

fn bullish_harami(ctx: &PatternContext, _t: &PatternThresholds) -> Option<f64> {
    let (prev, curr) = (ctx.bar(1), ctx.bar(0));
    if prev.is_bearish() && curr.is_bullish() && body_inside(curr, prev) {
        return Some(1.0 - ratio(curr.body(), prev.body()));
    }
    None
}

fn bearish_harami(ctx: &PatternContext, _t: &PatternThresholds) -> Option<f64> {
    let (prev, curr) = (ctx.bar(1), ctx.bar(0));
    if prev.is_bullish() && curr.is_bearish() && body_inside(curr, prev) {
        return Some(1.0 - ratio(curr.body(), prev.body()));
    }
    None
}

fn tweezer_match(a: f64, b: f64, reference: f64, t: &PatternThresholds) -> Option<f64> {
    let allowed = t.tweezer_tolerance * reference.abs();
    let diff = (a - b).abs();
    if diff <= allowed {
        return Some(if allowed > 0.0 { 1.0 - diff / allowed } else { 1.0 });
    }
    None
}

fn tweezer_bottom(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let (prev, curr) = (ctx.bar(1), ctx.bar(0));
    if prev.is_bearish() && curr.is_bullish() {
        return tweezer_match(prev.low, curr.low, curr.close, t);
    }
    None
}

fn tweezer_top(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let (prev, curr) = (ctx.bar(1), ctx.bar(0));
    if prev.is_bullish() && curr.is_bearish() {
        return tweezer_match(prev.high, curr.high, curr.close, t);
    }
    None
}

fn doji_body(bar: &Bar, t: &PatternThresholds) -> Option<f64> {
    let range = bar.range();
    if range == 0.0 {
        return None;
    }
    let body_ratio = bar.body() / range;
    if body_ratio <= t.doji_body_ratio {
        return Some(excess(t.doji_body_ratio, body_ratio, t.doji_body_ratio));
    }
    None
}

fn dragonfly_doji(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let bar = ctx.bar(0);
    let strength = doji_body(bar, t)?;
    (bar.upper_wick() <= t.short_wick_range_ratio * bar.range()).then_some(strength)
}

fn gravestone_doji(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let bar = ctx.bar(0);
    let strength = doji_body(bar, t)?;
    (bar.lower_wick() <= t.short_wick_range_ratio * bar.range()).then_some(strength)
}

/// Small body, long lower shadow, little/no upper shadow
fn hammer_shape(bar: &Bar, t: &PatternThresholds) -> Option<f64> {
    let range = bar.range();
    if range == 0.0 {
        return None;
    }
    let body = bar.body();
    let lower = bar.lower_wick();
    let min_lower = t.long_wick_body_multiple * body;
    if body / range <= t.small_body_ratio
        && lower >= min_lower
        && bar.upper_wick() <= t.short_wick_range_ratio * range
    {
        return Some(excess(lower, min_lower, range));
    }
    None
}

/// Small body, long upper shadow, little/no lower shadow
fn inverted_hammer_shape(bar: &Bar, t: &PatternThresholds) -> Option<f64> {
    let range = bar.range();
    if range == 0.0 {
        return None;
    }
    let body = bar.body();
    let upper = bar.upper_wick();
    let min_upper = t.long_wick_body_multiple * body;
    if body / range <= t.small_body_ratio
        && upper >= min_upper
        && bar.lower_wick() <= t.short_wick_range_ratio * range
    {
        return Some(excess(upper, min_upper, range));
    }
    None
}

fn hammer(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    if ctx.prior_trend == Trend::Uptrend {
        return None;
    }
    hammer_shape(ctx.bar(0), t)
}

fn hanging_man(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    if ctx.prior_trend != Trend::Uptrend {
        return None;
    }
    hammer_shape(ctx.bar(0), t)
}

fn inverted_hammer(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    if ctx.prior_trend == Trend::Uptrend {
        return None;
    }
    inverted_hammer_shape(ctx.bar(0), t)
}

fn shooting_star(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    if ctx.prior_trend != Trend::Uptrend {
        return None;
    }
    inverted_hammer_shape(ctx.bar(0), t)
}

fn marubozu_body(bar: &Bar, t: &PatternThresholds) -> Option<f64> {
    let body_ratio = ratio(bar.body(), bar.range());
    if bar.range() > 0.0 && body_ratio >= t.marubozu_body_ratio {
        return Some(excess(body_ratio, t.marubozu_body_ratio, 1.0 - t.marubozu_body_ratio));
    }
    None
}

fn bullish_marubozu(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let bar = ctx.bar(0);
    if bar.is_bullish() { marubozu_body(bar, t) } else { None }
}

fn bearish_marubozu(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let bar = ctx.bar(0);
    if bar.is_bearish() { marubozu_body(bar, t) } else { None }
}

fn doji(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    doji_body(ctx.bar(0), t)
}

fn spinning_top(ctx: &PatternContext, t: &PatternThresholds) -> Option<f64> {
    let bar = ctx.bar(0);
    let range = bar.range();
    let body = bar.body();
    if range == 0.0 || body / range > t.spinning_top_body_ratio || body / range <= t.doji_body_ratio {
        return None;
    }
    let shorter_wick = bar.upper_wick().min(bar.lower_wick());
    if shorter_wick >= body {
        return Some(excess(shorter_wick / range, body / range, 0.5));
    }
    None
}

/// One entry of the ordered rule table: the predicate returns how far the
/// geometry clears its minimum, in [0, 1].
pub struct PatternRule {
    pub pattern: CandlestickPattern,
    pub base_confidence: f64,
    matches: fn(&PatternContext, &PatternThresholds) -> Option<f64>,
}

macro_rules! rule {
    ($pattern:ident, $base:expr, $matches:ident) => {
        PatternRule {
            pattern: CandlestickPattern::$pattern,
            base_confidence: $base,
            matches: $matches,
        }
    };
}

/// Evaluation order: three-bar, then two-bar, then single-bar patterns, each
/// tier from most to least specific. The first match sets `current`.
pub static PATTERN_RULES: &[PatternRule] = &[
    rule!(MorningStar, 0.7, morning_star),
    rule!(EveningStar, 0.7, evening_star),
    rule!(ThreeWhiteSoldiers, 0.7, three_white_soldiers),
    rule!(ThreeBlackCrows, 0.7, three_black_crows),
    rule!(BullishEngulfing, 0.65, bullish_engulfing),
    rule!(BearishEngulfing, 0.65, bearish_engulfing),
    rule!(PiercingLine, 0.6, piercing_line),
    rule!(DarkCloudCover, 0.6, dark_cloud_cover),
    rule!(BullishHarami, 0.5, bullish_harami),
    rule!(BearishHarami, 0.5, bearish_harami),
    rule!(TweezerBottom, 0.5, tweezer_bottom),
    rule!(TweezerTop, 0.5, tweezer_top),
    rule!(DragonflyDoji, 0.55, dragonfly_doji),
    rule!(GravestoneDoji, 0.55, gravestone_doji),
    rule!(Hammer, 0.6, hammer),
    rule!(HangingMan, 0.55, hanging_man),
    rule!(InvertedHammer, 0.55, inverted_hammer),
    rule!(ShootingStar, 0.6, shooting_star),
    rule!(BullishMarubozu, 0.5, bullish_marubozu),
    rule!(BearishMarubozu, 0.5, bearish_marubozu),
    rule!(Doji, 0.4, doji),
    rule!(SpinningTop, 0.3, spinning_top),
];

/// Classify the most recent bars of `bars` against the ordered rule table
pub fn detect_patterns(bars: &[Bar], thresholds: &PatternThresholds) -> PatternResult {
    if let Err(e) = require_len(bars, 1, "candlestick patterns") {
        debug!("{}", e);
        return PatternResult::none();
    }

    let ctx = PatternContext::new(bars, thresholds.trend_lookback);
    let mut current: Option<(CandlestickPattern, f64)> = None;
    let mut patterns = Vec::new();

    for rule in PATTERN_RULES {
        if bars.len() < rule.pattern.min_bars() {
            continue;
        }
        let Some(strength) = (rule.matches)(&ctx, thresholds) else {
            continue;
        };
        let strength = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 0.0 };
        let confidence =
            (rule.base_confidence + (1.0 - rule.base_confidence) * strength).clamp(0.0, 1.0);

        if current.is_none() {
            current = Some((rule.pattern, confidence));
        }
        patterns.push(rule.pattern);
    }

    match current {
        Some((pattern, confidence)) => PatternResult {
            current: pattern,
            confidence,
            patterns,
        },
        None => PatternResult::none(),
    }
}
