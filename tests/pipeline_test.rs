//! パイプライン全体の結線テスト。外部ソースはモックサーバで代替する。

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autoname_resolver::alias::BrandTable;
use autoname_resolver::clients::{EncyclopediaClient, LlmClient, OfficialSearchClient};
use autoname_resolver::external::{
    EncyclopediaSource, ExternalNameResolver, LlmSource, LookupSource, OfficialSiteSource,
    builtin_official_domains,
};
use autoname_resolver::pipeline::NameResolutionPipeline;
use autoname_resolver::schema::{RawNameInput, ResolutionSource, UNRESOLVED_PLACEHOLDER};
use autoname_resolver::util::retry::RetryConfig;

fn brand_table() -> Arc<BrandTable> {
    Arc::new(BrandTable::builtin("itest-v1"))
}

fn official_source(
    server: &MockServer,
    table: &Arc<BrandTable>,
    retry: RetryConfig,
) -> Arc<dyn LookupSource> {
    let client = OfficialSearchClient::new(
        server.uri(),
        "test-key",
        "test-cx",
        Duration::from_secs(1),
        Duration::from_secs(2),
        retry,
    )
    .expect("search client");
    Arc::new(OfficialSiteSource::new(
        client,
        builtin_official_domains(),
        Arc::clone(table),
    ))
}

fn encyclopedia_source(server: &MockServer, table: &Arc<BrandTable>) -> Arc<dyn LookupSource> {
    let client = EncyclopediaClient::new(
        server.uri(),
        "en",
        Duration::from_secs(1),
        Duration::from_secs(2),
    )
    .expect("encyclopedia client");
    Arc::new(EncyclopediaSource::new(client, Arc::clone(table)))
}

fn llm_source(server: &MockServer, table: &Arc<BrandTable>) -> Arc<dyn LookupSource> {
    let client = LlmClient::new(
        server.uri(),
        "test-model",
        Duration::from_secs(1),
        Duration::from_secs(2),
    )
    .expect("llm client");
    Arc::new(LlmSource::new(client, Arc::clone(table)))
}

fn pipeline(table: Arc<BrandTable>, sources: Vec<Arc<dyn LookupSource>>) -> NameResolutionPipeline {
    NameResolutionPipeline::builder(table)
        .with_external(Arc::new(ExternalNameResolver::new(
            sources,
            Duration::from_secs(5),
        )))
        .build()
}

#[tokio::test]
async fn rule_and_dictionary_paths_do_not_touch_network() {
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .expect(0)
        .mount(&search)
        .await;

    let table = brand_table();
    let pipeline = pipeline(
        Arc::clone(&table),
        vec![official_source(&search, &table, RetryConfig::default())],
    );

    let resolved = pipeline
        .resolve_one(RawNameInput::title("宏光MINIEV（五菱汽车）"))
        .await;
    assert_eq!(resolved.brand, "Wuling");
    assert_eq!(resolved.model, "宏光MINIEV");
    assert_eq!(resolved.source, ResolutionSource::Rule);

    let resolved = pipeline
        .resolve_one(RawNameInput::breadcrumb("星越L 参数配置").with_brand_hint("吉利"))
        .await;
    assert_eq!(resolved.brand, "Geely");
    assert_eq!(resolved.model, "星越L");
    assert_eq!(resolved.source, ResolutionSource::Dictionary);
}

#[tokio::test]
async fn official_site_source_resolves_unmatched_title() {
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("key", "test-key"))
        .and(query_param("cx", "test-cx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {
                    "title": "Some Car Blog - Seal 05 review",
                    "link": "https://carblog.example.com/seal-05",
                    "snippet": "review"
                },
                {
                    "title": "All New BYD Seal 05 DM-i",
                    "link": "https://www.byd.com/cn/seal-05-dmi",
                    "snippet": "official"
                }
            ]
        })))
        .expect(1)
        .mount(&search)
        .await;

    let table = brand_table();
    let pipeline = pipeline(
        Arc::clone(&table),
        vec![official_source(&search, &table, RetryConfig::default())],
    );

    let resolved = pipeline.resolve_one(RawNameInput::title("海豹05")).await;

    // 許可リスト外のドメインは飛ばし、公式ドメインのタイトルだけを採る
    assert_eq!(resolved.brand, "BYD");
    assert_eq!(resolved.model, "Seal 05 DM-i");
    assert_eq!(resolved.source, ResolutionSource::Official);
    assert!((resolved.confidence - 0.6).abs() < f32::EPSILON);
}

#[tokio::test]
async fn failed_official_source_falls_back_to_encyclopedia() {
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&search)
        .await;

    let encyclopedia = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("titles", "星越L"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "query": {
                "pages": {
                    "42": {
                        "pageid": 42,
                        "title": "星越L",
                        "langlinks": [{"lang": "en", "*": "Geely Xingyue L"}]
                    }
                }
            }
        })))
        .mount(&encyclopedia)
        .await;

    let table = brand_table();
    let pipeline = pipeline(
        Arc::clone(&table),
        vec![
            official_source(&search, &table, RetryConfig::new(1, 1, 1)),
            encyclopedia_source(&encyclopedia, &table),
        ],
    );

    let resolved = pipeline.resolve_one(RawNameInput::title("星越L")).await;

    assert_eq!(resolved.brand, "Geely");
    assert_eq!(resolved.model, "Xingyue L");
    assert_eq!(resolved.source, ResolutionSource::Encyclopedia);
    assert!((resolved.confidence - 0.5).abs() < f32::EPSILON);
}

#[tokio::test]
async fn llm_source_is_the_last_resort() {
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&search)
        .await;

    let encyclopedia = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "query": {"pages": {"-1": {"title": "星越L", "missing": ""}}}
        })))
        .mount(&encyclopedia)
        .await;

    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Geely|Xingyue L"}}]
        })))
        .expect(1)
        .mount(&llm)
        .await;

    let table = brand_table();
    let pipeline = pipeline(
        Arc::clone(&table),
        vec![
            official_source(&search, &table, RetryConfig::new(1, 1, 1)),
            encyclopedia_source(&encyclopedia, &table),
            llm_source(&llm, &table),
        ],
    );

    let resolved = pipeline.resolve_one(RawNameInput::title("星越L")).await;

    assert_eq!(resolved.brand, "Geely");
    assert_eq!(resolved.model, "Xingyue L");
    assert_eq!(resolved.source, ResolutionSource::Llm);
    assert!((resolved.confidence - 0.4).abs() < f32::EPSILON);
}

#[tokio::test]
async fn batch_output_is_total_and_order_preserving() {
    let table = brand_table();
    let pipeline = NameResolutionPipeline::builder(table).build();

    let inputs = vec![
        RawNameInput::title("宏光MINIEV（五菱汽车）"),
        RawNameInput::title("2024款 报价"),
        RawNameInput::title("上汽大众朗逸"),
        RawNameInput::card_text("奇瑞汽车股份有限公司 - 瑞虎8"),
        RawNameInput::title("Tesla Model Y"),
    ];
    let expected_texts: Vec<String> = inputs.iter().map(|i| i.text.clone()).collect();

    let results = pipeline.resolve_batch(inputs).await;

    assert_eq!(results.len(), 5);
    let actual_texts: Vec<String> = results.iter().map(|r| r.input.text.clone()).collect();
    assert_eq!(actual_texts, expected_texts);

    assert_eq!(results[0].brand, "Wuling");
    assert_eq!(results[1].brand, UNRESOLVED_PLACEHOLDER);
    assert_eq!(results[1].model, UNRESOLVED_PLACEHOLDER);
    assert_eq!(results[1].source, ResolutionSource::Unresolved);
    assert_eq!(results[2].brand, "Volkswagen");
    assert_eq!(results[3].brand, "Chery");
    assert_eq!(results[3].model, "瑞虎8");
    assert_eq!(results[4].brand, "Tesla");
    assert_eq!(results[4].model, "Model Y");
}
