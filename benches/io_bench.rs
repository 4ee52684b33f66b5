// benches/io_bench.rs
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flowbuf::pool::PoolConfig;
use flowbuf::{Input, Output, StandardIoPool};
use std::hint::black_box;

fn pool(buffer_size: usize) -> std::sync::Arc<dyn flowbuf::IoBufferPool> {
    StandardIoPool::new(PoolConfig {
        buffer_size,
        max_pool_size: 64,
        min_pool_size: 8,
    })
}

fn chunked_input(data: std::sync::Arc<Vec<u8>>, chunk: usize) -> Input {
    let p = pool(chunk);
    let mut cursor = 0usize;
    Input::new(p, move |buf, start, end| {
        let remaining = data.len() - cursor;
        if remaining == 0 {
            return Ok(0);
        }
        let take = remaining.min(end - start);
        buf.write_slice(start, &data[cursor..cursor + take])?;
        cursor += take;
        Ok(take)
    })
}

fn sink_output(buffer_size: usize) -> Output {
    let p = pool(buffer_size);
    Output::new(p, |bytes| {
        black_box(bytes.len());
        Ok(())
    })
}

fn bench_read_byte_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("input_read_byte_array");

    for size in [4096usize, 65536, 1 << 20].iter() {
        let data = std::sync::Arc::new(vec![0x5Au8; *size]);
        group.bench_with_input(BenchmarkId::new("drain", size), size, |b, &size| {
            b.iter(|| {
                let mut input = chunked_input(data.clone(), 4096);
                let bytes = input.read_byte_array(Some(size)).unwrap();
                black_box(bytes);
            });
        });
    }

    group.finish();
}

fn bench_copy_to(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_to");

    for size in [4096usize, 65536, 1 << 20].iter() {
        let data = std::sync::Arc::new(vec![0x5Au8; *size]);
        group.bench_with_input(BenchmarkId::new("zero_copy", size), size, |b, &size| {
            b.iter(|| {
                let mut input = chunked_input(data.clone(), 4096);
                let mut output = sink_output(4096);
                let copied = input.copy_to(&mut output, Some(size)).unwrap();
                black_box(copied);
            });
        });
    }

    group.finish();
}

fn bench_preview_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("preview_overhead");
    let data = std::sync::Arc::new(vec![0x5Au8; 65536]);

    group.bench_function("plain_copy", |b| {
        b.iter(|| {
            let mut input = chunked_input(data.clone(), 4096);
            let mut output = sink_output(4096);
            let copied = input.copy_to(&mut output, Some(65536)).unwrap();
            black_box(copied);
        });
    });

    group.bench_function("previewed_copy", |b| {
        b.iter(|| {
            let mut input = chunked_input(data.clone(), 4096);
            input
                .preview(|inner| {
                    let mut output = sink_output(4096);
                    let copied = inner.copy_to(&mut output, Some(65536)).unwrap();
                    black_box(copied);
                })
                .unwrap();
        });
    });

    group.finish();
}

fn bench_write_byte_vs_write_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("output_writes");
    let payload = vec![0x33u8; 8192];

    group.bench_function("write_byte_loop", |b| {
        b.iter(|| {
            let mut output = sink_output(4096);
            for &byte in &payload {
                output.write_byte(black_box(byte)).unwrap();
            }
            output.close().unwrap();
        });
    });

    group.bench_function("write_buffer_bulk", |b| {
        b.iter(|| {
            let mut output = sink_output(4096);
            output.write_buffer(black_box(&payload)).unwrap();
            output.close().unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_read_byte_array,
    bench_copy_to,
    bench_preview_overhead,
    bench_write_byte_vs_write_buffer
);

criterion_main!(benches);
