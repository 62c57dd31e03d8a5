use std::hint::black_box;

use bencher::{Framing, ResponseFixture};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use micro_http_client::codec::ResponseDecoder;
use micro_http_client::protocol::{Message, PayloadItem};
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

static SMALL_RESPONSE: ResponseFixture = ResponseFixture::with_length("get_small", include_str!("../resources/response/get_small.txt"));
static LARGE_RESPONSE: ResponseFixture = ResponseFixture::with_length("get_large", include_str!("../resources/response/get_large.txt"));
static CHUNKED_RESPONSE: ResponseFixture = ResponseFixture::chunked("chunked", include_str!("../resources/response/chunked.txt"));

fn decode_all(decoder: &mut ResponseDecoder, bytes: &mut BytesMut) -> usize {
    let mut body_len = 0;
    loop {
        match decoder.decode(bytes).expect("fixture should be a valid http response") {
            Some(Message::Header(head)) => {
                black_box(head);
            }
            Some(Message::Payload(PayloadItem::Chunk(chunk))) => body_len += chunk.len(),
            Some(Message::Payload(PayloadItem::Eof)) => return body_len,
            None => panic!("fixture should hold a complete response"),
        }
    }
}

fn benchmark_response_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("response_decoder");

    for fixture in [SMALL_RESPONSE, LARGE_RESPONSE, CHUNKED_RESPONSE] {
        group.throughput(Throughput::Bytes(fixture.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fixture.name()), &fixture, |b, fixture| {
            let mut decoder = ResponseDecoder::default();
            b.iter_batched_ref(
                || BytesMut::from(fixture.content()),
                |bytes_mut| black_box(decode_all(&mut decoder, bytes_mut)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_chunked_body(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("chunked_body");
    let fixture = CHUNKED_RESPONSE;
    assert_eq!(fixture.framing(), Framing::Chunked);

    // only the body part, the head is decoded once per batch
    group.throughput(Throughput::Bytes(fixture.len() as u64));
    group.bench_function(fixture.name(), |b| {
        b.iter_batched_ref(
            || {
                let mut decoder = ResponseDecoder::default();
                let mut bytes = BytesMut::from(fixture.content());
                let head = decoder.decode(&mut bytes).expect("valid head");
                assert!(matches!(head, Some(Message::Header(_))));
                (decoder, bytes)
            },
            |(decoder, bytes_mut)| black_box(decode_all(decoder, bytes_mut)),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(decoder, benchmark_response_decoder, benchmark_chunked_body);
criterion_main!(decoder);
