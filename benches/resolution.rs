/// ネットワークを伴わないローカル解決経路のベンチマーク。
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use autoname_resolver::alias::{AliasResolver, BrandTable};
use autoname_resolver::normalize::normalize;
use autoname_resolver::split::RuleBasedSplitter;

const TITLES: [&str; 8] = [
    "宏光MINIEV（五菱汽车）",
    "上汽大众朗逸",
    "【图】 星越L　参数配置",
    "比亚迪海豹05 DM-i",
    "奇瑞汽车股份有限公司 - 瑞虎8",
    "Tesla Model Y",
    "长安UNI-Z新能源",
    "一汽—大众 揽境",
];

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_titles", |b| {
        b.iter(|| {
            for title in TITLES {
                black_box(normalize(title));
            }
        });
    });
}

fn bench_rule_split(c: &mut Criterion) {
    let splitter = RuleBasedSplitter::new(Arc::new(BrandTable::builtin("bench-v1")));
    let normalized: Vec<String> = TITLES.iter().map(|t| normalize(t)).collect();

    c.bench_function("rule_split_titles", |b| {
        b.iter(|| {
            for text in &normalized {
                black_box(splitter.split(text));
            }
        });
    });
}

fn bench_alias_lookup(c: &mut Criterion) {
    let resolver = AliasResolver::new(Arc::new(BrandTable::builtin("bench-v1")));
    let brands = ["上汽通用五菱汽车股份有限公司", "比亚迪", "Geely Auto", "不存在的厂商"];

    c.bench_function("alias_lookup", |b| {
        b.iter(|| {
            for brand in brands {
                black_box(resolver.resolve(brand));
            }
        });
    });
}

criterion_group!(benches, bench_normalize, bench_rule_split, bench_alias_lookup);
criterion_main!(benches);
