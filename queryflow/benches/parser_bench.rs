//! Benchmarks for structured response parsing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use queryflow::parser::{
    extract_block, parse_response, RequirementResponse, SqlGenerationResponse,
};

const REQUIREMENT: &str = "Let me check the schema first.

```yaml
reply: |
  I will count the orders per month for 2024.
schema_tool_name: salesDataSchemaGetter
requirement: |
  Count orders grouped by calendar month for 2024.
  Use the orders table and its created_at column.
is_requirement_clear: true
is_already_answered_without_further_queries: false
```";

const SQL: &str = "```yaml
reply: Here is the query.
sql: |
  SELECT date_trunc('month', created_at) AS month, count(*) AS orders
  FROM orders
  WHERE created_at >= '2024-01-01'
  GROUP BY 1
  ORDER BY 1
```";

fn parser_benchmark(c: &mut Criterion) {
    c.bench_function("extract_block", |b| {
        b.iter(|| extract_block(black_box(REQUIREMENT)))
    });

    c.bench_function("parse_requirement", |b| {
        b.iter(|| parse_response::<RequirementResponse>(black_box(REQUIREMENT)))
    });

    c.bench_function("parse_sql", |b| {
        b.iter(|| parse_response::<SqlGenerationResponse>(black_box(SQL)))
    });
}

criterion_group!(benches, parser_benchmark);
criterion_main!(benches);
