use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hwmp_core::MacAddr;
use hwmp_core::element::{Preq, PreqTarget};
use hwmp_core::{ActionFrame, AddressExtension, Element};
use hwmp_routing::seen::PreqSeenCache;
use hwmp_routing::{
    AirtimeMetric, EngineConfig, HwmpEngine, LinkStats, MeshState, PathProtocol, RouteCandidate,
    RouteTable,
};

fn make_dest(i: u32) -> MacAddr {
    let b = i.to_be_bytes();
    MacAddr::new([0x02, 0x00, b[0], b[1], b[2], b[3]])
}

fn populate(table: &RouteTable, count: u32) {
    for i in 0..count {
        table.update_or_insert(
            make_dest(i),
            RouteCandidate::new(make_dest(0xffff), 100, 3, i, 5000),
            0,
        );
    }
}

fn bench_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_table");

    for (label, fill) in [("empty", 0u32), ("512", 512), ("1024", 1024)] {
        let table = RouteTable::new(1024);
        populate(&table, fill);
        let hit = make_dest(fill / 2);

        group.bench_with_input(BenchmarkId::new("next_hop", label), &table, |b, t| {
            b.iter(|| t.next_hop(&hit, 1));
        });
    }

    let table = RouteTable::new(1024);
    populate(&table, 512);
    let mut seq = 0u32;
    group.bench_function("update_fresher", |b| {
        b.iter(|| {
            seq = seq.wrapping_add(1);
            table.update_or_insert(
                make_dest(7),
                RouteCandidate::new(make_dest(0xffff), 100, 3, seq, 5000),
                0,
            )
        });
    });

    group.bench_function("insert_with_eviction", |b| {
        let full = RouteTable::new(256);
        populate(&full, 256);
        let mut i = 256u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            full.update_or_insert(
                make_dest(i),
                RouteCandidate::new(make_dest(0xffff), 100, 3, 1, 5000),
                0,
            )
        });
    });

    group.finish();
}

fn bench_seen(c: &mut Criterion) {
    let mut group = c.benchmark_group("preq_seen");
    let mut cache = PreqSeenCache::new(5000);
    for i in 0..2048 {
        cache.insert(make_dest(i), i, 0);
    }
    let mut id = 0u32;
    group.bench_function("insert_new", |b| {
        b.iter(|| {
            id = id.wrapping_add(1);
            cache.insert(make_dest(id % 64), 10_000 + id, 1)
        });
    });
    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    let config = EngineConfig::default();
    let engine = HwmpEngine::new(config.clone(), Box::new(AirtimeMetric));
    let state = MeshState::new(make_dest(1), &config);
    let from = make_dest(2);
    state.peer_up(from, LinkStats::new(540, 0));

    let mut preq_id = 0u32;
    group.bench_function("relay_preq", |b| {
        b.iter(|| {
            preq_id = preq_id.wrapping_add(1);
            let frame = ActionFrame::hwmp(vec![Element::Preq(Preq {
                flags: 0,
                hop_count: 2,
                ttl: 29,
                preq_id,
                originator: make_dest(3),
                originator_seq: preq_id,
                ext: AddressExtension::None,
                lifetime: 5000,
                metric: 64,
                targets: vec![PreqTarget {
                    flags: 0x05,
                    target: make_dest(4),
                    seq: 0,
                }],
            })]);
            engine.handle_frame(&state, from, &frame, 0)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_table, bench_seen, bench_engine);
criterion_main!(benches);
