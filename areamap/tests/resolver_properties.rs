//! Propriétés du résolveur sur un store de référence

use areamap::{MatchKind, MemoryStore, PostalRecord, Reporter, Resolution, Resolver, WeatherArea};

fn fixture() -> MemoryStore {
    MemoryStore::from_records(
        [
            PostalRecord::new("1000001", "東京都", "千代田区").with_town("千代田"),
            PostalRecord::new("0600042", "北海道", "札幌市中央区").with_town("大通西"),
            PostalRecord::new("9813100", "宮城県", "仙台市泉区"),
            PostalRecord::new("0550000", "北海道", "沙流郡日高町"),
            PostalRecord::new("2730100", "千葉県", "鎌ケ谷市"),
            PostalRecord::new("8170022", "長崎県", "対馬市").with_town("厳原町国分"),
            PostalRecord::new("8170322", "長崎県", "対馬市").with_town("上県町佐須奈"),
            PostalRecord::new("9999999", "沖縄県", "離島村"),
            PostalRecord::new("1006890", "東京都", "小笠原村"),
        ],
        [
            WeatherArea::new("130010", "東京都", "東京地方", "千代田区"),
            WeatherArea::new("016010", "北海道", "石狩地方", "札幌市"),
            WeatherArea::new("015010", "北海道", "日高地方", "日高町"),
            WeatherArea::new("040011", "宮城県", "東部", "仙台市東部"),
            WeatherArea::new("040012", "宮城県", "西部", "仙台市西部"),
            WeatherArea::new("120010", "千葉県", "北西部", "鎌ヶ谷市"),
            WeatherArea::new("420040", "長崎県", "対馬地方", "上対馬"),
            WeatherArea::new("420041", "長崎県", "対馬地方", "下対馬"),
        ],
    )
}

const STORED_CODES: &[&str] = &[
    "1000001", "0600042", "9813100", "0550000", "2730100", "8170022", "8170322", "9999999",
    "1006890",
];

#[tokio::test]
async fn every_stored_code_resolves_to_itself() {
    let store = fixture();
    let resolver = Resolver::new(&store);

    for code in STORED_CODES {
        match resolver.resolve(code).await.unwrap() {
            Resolution::Single(mapping) => assert_eq!(mapping.postal_code, *code),
            other => panic!("{code}: expected a single mapping, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn absent_codes_are_not_found() {
    let store = fixture();
    let resolver = Resolver::new(&store);

    for code in ["0000000", "1000009", "999-9998"] {
        let err = resolver.resolve(code).await.unwrap_err();
        assert!(err.is_not_found(), "{code}: {err}");
    }
}

#[tokio::test]
async fn resolve_is_idempotent() {
    let store = fixture();
    let resolver = Resolver::new(&store);

    for code in STORED_CODES {
        let first = resolver.resolve(code).await.unwrap();
        let second = resolver.resolve(code).await.unwrap();
        assert_eq!(first, second);
    }

    let first = resolver.resolve("対馬").await.unwrap();
    let second = resolver.resolve("対馬").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn hierarchy_examples() {
    let store = fixture();
    let resolver = Resolver::new(&store);

    let tokyo = resolver.resolve_code("1000001").await.unwrap();
    assert_eq!(tokyo.region(), Some("東京地方"));

    let okinawa = resolver.resolve_code("9999999").await.unwrap();
    assert_eq!(okinawa.area_code(), None);

    let cases = [
        ("0600042", "016010", MatchKind::WardStripped),
        ("9813100", "040012", MatchKind::DesignatedCityRegion),
        ("0550000", "015010", MatchKind::Substring),
        ("2730100", "120010", MatchKind::KanaVariant),
        ("8170022", "420041", MatchKind::Tsushima),
        ("8170322", "420040", MatchKind::Tsushima),
    ];
    for (code, area, kind) in cases {
        let mapping = resolver.resolve_code(code).await.unwrap();
        assert_eq!(mapping.area_code(), Some(area), "{code}");
        assert_eq!(mapping.matched_by(), Some(kind), "{code}");
    }
}

#[tokio::test]
async fn summary_counts_match_resolutions() {
    let store = fixture();
    let stats = Reporter::new(&store).summarize().await.unwrap();

    assert_eq!(stats.total_postal_codes, STORED_CODES.len());
    assert_eq!(stats.unmapped_count, 2);
    assert_eq!(stats.mapped_count + stats.unmapped_count, stats.total_postal_codes);
    assert!((0.0..=1.0).contains(&stats.mapping_rate));
}

#[tokio::test]
async fn two_codes_one_mapped() {
    let store = MemoryStore::from_records(
        [
            PostalRecord::new("1000001", "東京都", "千代田区"),
            PostalRecord::new("9999999", "沖縄県", "離島村"),
        ],
        [WeatherArea::new("130010", "東京都", "東京地方", "千代田区")],
    );

    let stats = Reporter::new(&store).summarize().await.unwrap();
    assert_eq!(stats.total_postal_codes, 2);
    assert_eq!(stats.mapped_count, 1);
    assert_eq!(stats.unmapped_count, 1);
    assert_eq!(stats.mapping_rate, 0.5);
}
