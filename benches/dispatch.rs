use criterion::{criterion_group, criterion_main, Criterion};
use dynform::control::{Element, PageControl};
use dynform::handler::{Declaration, HandlerTree, RenderContext};
use dynform::page::Page;
use dynform::server::Request;
use std::hint::black_box;

#[derive(Default)]
struct BenchPage;

impl Page for BenchPage {}

#[derive(Default)]
struct MainControl;

impl PageControl for MainControl {
    type Ui = Element;

    fn build_ui(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<Element> {
        let mut ui = Element::new("div");
        for i in 0..8 {
            ui.push(Element::raw(ctx.place_child(&format!("row{i}"))?));
        }
        Ok(ui)
    }
}

fn bench_tree() -> HandlerTree {
    let mut main = Declaration::control::<MainControl>().shared_fields(["session"]);
    for i in 0..8 {
        main = main.child(
            Declaration::from_fn("Row", move |ctx| {
                Ok(format!("<p>{} {}</p>", ctx.render_id(), i))
            })
            .named(format!("row{i}"))
            .grab_fields(["filter"]),
        );
    }
    HandlerTree::build(&Declaration::page::<BenchPage>().child(main)).unwrap()
}

fn bench_dispatch(c: &mut Criterion) {
    let tree = bench_tree();

    c.bench_function("dispatch_leaf", |b| {
        b.iter(|| {
            let request = Request::builder()
                .field("requestHandler", "benchPage.mainControl.row3")
                .build();
            black_box(tree.dispatch(black_box(request)))
        })
    });

    c.bench_function("dispatch_whole_page", |b| {
        b.iter(|| black_box(tree.dispatch(Request::new())))
    });

    c.bench_function("dispatch_not_found", |b| {
        b.iter(|| {
            let request = Request::builder()
                .field("requestHandler", "benchPage.mainControl.missing")
                .build();
            black_box(tree.dispatch(request))
        })
    });

    c.bench_function("dispatch_fan_out_8", |b| {
        let targets: Vec<String> = (0..8)
            .map(|i| format!("benchPage.mainControl.row{i}"))
            .collect();
        b.iter(|| {
            let request = Request::builder()
                .field("requestHandler", targets.clone())
                .build();
            black_box(tree.dispatch(request))
        })
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
