//! Benchmarks for parsing, expression compilation and ticking.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lexagent::agent::Agent;
use lexagent::config::AgentConfig;
use lexagent::lexicon::{Arity, Predicate, WordType};
use lexagent::world::{MemoryWorld, ObjectSpec, World, WorldObject};

fn taught_agent() -> Agent {
    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.teach("red", WordType::Property, "obj.color == 'red'").unwrap();
    agent.teach("blue", WordType::Property, "obj.color == 'blue'").unwrap();
    agent.teach("box", WordType::Noun, "obj.shape == 'box'").unwrap();
    agent.teach("ball", WordType::Noun, "obj.shape == 'ball'").unwrap();
    agent
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_relation", |bench| {
        bench.iter(|| {
            black_box(
                Predicate::compile(
                    "obj1.size > obj2.size && (obj1.color == 'red' || obj1.owner == 'agent')",
                    Arity::Binary,
                )
                .unwrap(),
            )
        })
    });
}

fn bench_query(c: &mut Criterion) {
    let mut agent = taught_agent();
    for i in 0..100 {
        let color = if i % 2 == 0 { "red" } else { "blue" };
        agent
            .world_mut()
            .create_object(ObjectSpec::default().color(color).shape("box"))
            .unwrap();
    }

    c.bench_function("query_red_box_100", |bench| {
        bench.iter(|| black_box(agent.process("what is a red box or not blue ball")))
    });
}

fn bench_tick(c: &mut Criterion) {
    c.bench_function("possession_goal_two_ticks", |bench| {
        bench.iter(|| {
            let mut agent = taught_agent();
            agent.set_goal("i have a red ball").unwrap();
            black_box(agent.run(4))
        })
    });
}

fn bench_world_find(c: &mut Criterion) {
    let mut world = MemoryWorld::new(40, 40);
    for i in 0..1000 {
        world
            .create_object(ObjectSpec::default().size(i % 20))
            .unwrap();
    }
    c.bench_function("find_objects_1000", |bench| {
        bench.iter(|| black_box(world.find_objects(&|o: &WorldObject| o.size > 10)))
    });
}

criterion_group!(benches, bench_compile, bench_query, bench_tick, bench_world_find);
criterion_main!(benches);
