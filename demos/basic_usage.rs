use paging_source::impls::memory::MemoryTable;
use paging_source::KeysetPager;
use paging_source::LoadResult;
use paging_source::OffsetPager;
use paging_source::PagingConfig;
use paging_source::PagingError;
use paging_source::PagingSource;
use paging_source::SortOrder;

#[tokio::main]
async fn main() -> Result<(), PagingError> {
    // A table of 10 rows keyed by 0..10
    let table = MemoryTable::from_iter((0..10u64).map(|i| (i, format!("row-{}", i))));

    // Offset paging: walk forward page by page
    let pager = OffsetPager::new(
        PagingConfig::new(3),
        table.count_provider(),
        table.offset_provider(),
    )?;
    let source = PagingSource::new(pager);

    let mut res = source.refresh(None).await?;
    while let LoadResult::Page(page) = res {
        println!(
            "offset page: {:?} prev={:?} next={:?}",
            page.data, page.prev_key, page.next_key
        );
        let Some(next) = page.next_key else { break };
        res = source.append(next).await?;
    }

    // Keyset paging: start around key 4
    let pager = KeysetPager::new(
        PagingConfig::new(3),
        SortOrder::Ascending,
        table.boundary_provider(SortOrder::Ascending),
        table.range_provider(SortOrder::Ascending),
    )?;
    let source = PagingSource::new(pager);

    if let Some(page) = source.refresh(Some(4)).await?.into_page() {
        println!(
            "keyset page: {:?} prev={:?} next={:?}",
            page.data, page.prev_key, page.next_key
        );
    }

    // Any write invalidates the session
    table.insert(42, "row-42".to_string());
    if source.is_invalidated() {
        println!("session invalidated, next load: {:?}", source.append(6).await?);
    }

    Ok(())
}
