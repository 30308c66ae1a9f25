//! Benchmark for random reads through the block cache.
//!
//!

use std::{fs::File, io::Write, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;

use blobio::{BlockManagerPool, ObjectStoreClient, ObjectUri, PhysicalIoConfig};

fn random_read_bench(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut rng = rand::thread_rng();

    const FILE_SIZE: usize = 64 * 1024 * 1024;
    let temp_file = tempfile::NamedTempFile::new().unwrap().into_temp_path();
    {
        let mut writer = File::create(temp_file.to_str().unwrap()).unwrap();
        let mut buf = vec![0_u8; 128 * 1024];

        for _ in 0..FILE_SIZE / (128 * 1024) {
            rng.fill(&mut buf[..]);
            writer.write_all(&buf).unwrap();
        }
    }

    for block_size in &[1024 * 1024_u64, 8 * 1024 * 1024] {
        let config = {
            let mut builder = PhysicalIoConfig::builder();
            builder
                .block_size_bytes(*block_size)
                .block_capacity(FILE_SIZE / *block_size as usize + 1);
            builder.build().unwrap()
        };
        let client = Arc::new(ObjectStoreClient::new(Arc::new(
            object_store::local::LocalFileSystem::new(),
        )));
        let pool = Arc::new(BlockManagerPool::new(client, config));
        let uri = ObjectUri::new("local", temp_file.to_str().unwrap());

        // Warm up the cache
        println!("Starting warm up cache with block size: {}", block_size);
        rt.block_on(async {
            let blob = pool.open_blob(&uri).unwrap();
            let mut buf = vec![0_u8; *block_size as usize];
            for i in 0..(FILE_SIZE as u64 / block_size) {
                let n = blob
                    .read(&mut buf, 0, buf.len(), i * block_size)
                    .await
                    .unwrap();
                assert!(n > 0);
            }
        });

        c.bench_function(
            format!("random_read,warm,block_size={}", block_size).as_str(),
            |b| {
                b.to_async(&rt).iter(|| {
                    let pool = pool.clone();
                    let uri = uri.clone();
                    async move {
                        let mut rng = rand::thread_rng();
                        let pos = rng.gen_range(0..(FILE_SIZE as u64 - 4096));
                        let blob = pool.open_blob(&uri).unwrap();

                        let mut buf = vec![0_u8; 4096];
                        let n = blob.read(&mut buf, 0, 4096, pos).await.unwrap();
                        assert_eq!(n, 4096);
                    }
                })
            },
        );
    }
}

criterion_group!(
    name=benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = random_read_bench);

criterion_main!(benches);
