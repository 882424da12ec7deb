use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ember_codec::parse_head;
use ember_core::SessionRegistry;
use std::time::Duration;

const HEAD: &[u8] = b"GET /index.tmpl?page=2&sort=asc HTTP/1.1\r\n\
Host: shop.example:8080\r\n\
User-Agent: bench\r\n\
Cookie: theme=dark; sid=\"abcdefghijklmnopqrstuvwxyzABCDEF\"\r\n\r\n";

fn session_performance(c: &mut Criterion) {
    let sessions = SessionRegistry::new(Duration::from_secs(600));
    for _ in 0..10_000 {
        sessions.create("shop.example");
    }
    let live = sessions.create("shop.example");
    let id = live.id().to_string();

    c.bench_function("session_resolve_hit", |b| {
        b.iter(|| sessions.resolve(black_box(Some(id.as_str())), "shop.example").created)
    });

    c.bench_function("head_parse_and_cookie", |b| {
        b.iter(|| {
            parse_head(black_box(HEAD))
                .ok()
                .and_then(|head| head.cookie("sid"))
        })
    });
}

criterion_group!(benches, session_performance);
criterion_main!(benches);
